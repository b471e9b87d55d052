//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Synchronous assessment on submit

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::artifact::VerificationStatus;
use crate::adapters::JsonArtifact;
use crate::application::AssessmentService;
use crate::config::AppConfig;
use crate::ports::ClassifierArtifact;

use super::ui::{
    dashboard::{render_dashboard, DashboardState},
    patient::{render_patient_form, PatientFormState},
    render_disclaimer,
    result::{render_result, ResultState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    PatientForm,
    Result,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,
    service: AssessmentService<JsonArtifact>,
    dashboard_state: DashboardState,
    patient_form_state: PatientFormState,
    result_state: ResultState,
}

impl App {
    /// Load and verify the configured artifact, then bind it to the schema.
    ///
    /// Refuses to start if the artifact cannot be loaded, verified or bound.
    ///
    /// # Errors
    /// Returns error if the artifact or the configuration is unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let policy = config.verification_policy()?;
        let artifact = JsonArtifact::load(&config.model_path, &policy)
            .with_context(|| format!("Failed to load model from {:?}", config.model_path))?;

        let service = AssessmentService::new(Arc::new(artifact), config.schema)?;
        Ok(Self::with_service(service))
    }

    /// Create the application around an already bound service.
    #[must_use]
    pub fn with_service(service: AssessmentService<JsonArtifact>) -> Self {
        let artifact = service.artifact();
        let dashboard_state = DashboardState {
            artifact_name: artifact.name().to_string(),
            schema: service.schema(),
            policy: service.policy(),
            capabilities: artifact.capabilities(),
            metadata: artifact.metadata(),
            verification: artifact.verification(),
            assessments: 0,
        };

        if dashboard_state.verification == VerificationStatus::Unsigned {
            tracing::warn!("Running with an UNSIGNED model artifact");
        }

        let patient_form_state = PatientFormState::new(service.schema());

        Self {
            screen: Screen::Dashboard,
            should_quit: false,
            service,
            dashboard_state,
            patient_form_state,
            result_state: ResultState::default(),
        }
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::Dashboard => render_dashboard(f, chunks[0], &self.dashboard_state),
                    Screen::PatientForm => {
                        render_patient_form(f, chunks[0], &self.patient_form_state)
                    }
                    Screen::Result => render_result(f, chunks[0], &self.result_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::PatientForm => self.handle_patient_form_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n' | 'N') => self.open_form(),
            KeyCode::Char('q' | 'Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_patient_form_key(&mut self, key: KeyCode) {
        let form = &mut self.patient_form_state;
        match key {
            KeyCode::Esc => {
                form.clear_sensitive();
                self.screen = Screen::Dashboard;
            }
            KeyCode::Up | KeyCode::BackTab => form.prev_field(),
            KeyCode::Down | KeyCode::Tab => form.next_field(),
            KeyCode::Left => form.decrement(),
            KeyCode::Right => form.increment(),
            KeyCode::Char('s' | 'S') => form.load_sample_data(),
            KeyCode::Char(c) => form.input_char(c),
            KeyCode::Backspace => form.delete_char(),
            KeyCode::Enter => self.submit_patient_form(),
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        let failed = matches!(self.result_state, ResultState::Error { .. });
        match (failed, key) {
            (true, KeyCode::Enter) => {
                self.discard_result();
                self.screen = Screen::PatientForm;
            }
            (_, KeyCode::Char('n' | 'N')) => {
                self.discard_result();
                self.open_form();
            }
            (_, KeyCode::Esc | KeyCode::Enter) => {
                self.discard_result();
                self.screen = Screen::Dashboard;
            }
            _ => {}
        }
    }

    /// A result is shown once; nothing of it outlives the Result screen.
    fn discard_result(&mut self) {
        self.result_state = ResultState::Idle;
    }

    fn open_form(&mut self) {
        self.patient_form_state.clear_sensitive();
        self.screen = Screen::PatientForm;
    }

    fn submit_patient_form(&mut self) {
        let input = match self.patient_form_state.to_raw_input() {
            Ok(input) => input,
            Err(message) => {
                self.patient_form_state.error_message = Some(message);
                return;
            }
        };

        self.result_state = match self.service.assess(&input) {
            Ok(assessment) => {
                self.dashboard_state.assessments += 1;
                // Input stays on screen for correction only when assessment fails.
                self.patient_form_state.clear_sensitive();
                ResultState::Complete(Box::new(assessment))
            }
            Err(e) => {
                tracing::error!(code = e.code(), "Assessment failed");
                ResultState::Error {
                    code: e.code(),
                    message: e.to_string(),
                }
            }
        };
        self.screen = Screen::Result;
    }
}

//! Dashboard view: loaded model and session overview.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::adapters::artifact::VerificationStatus;
use crate::domain::{DecisionPolicy, FeatureSchema};
use crate::ports::{ArtifactMetadata, Capabilities};
use crate::tui::styles::MedicalTheme;

/// Everything the dashboard shows. Built once at startup, counters updated
/// after each assessment.
pub struct DashboardState {
    pub artifact_name: String,
    pub schema: FeatureSchema,
    pub policy: DecisionPolicy,
    pub capabilities: Capabilities,
    pub metadata: ArtifactMetadata,
    pub verification: VerificationStatus,
    pub assessments: usize,
}

pub fn render_dashboard(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_model_panels(f, columns[0], state);
    render_session_panels(f, columns[1], state);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("HeartRisk", MedicalTheme::title()),
        Span::styled(" │ ", MedicalTheme::text_muted()),
        Span::styled("Heart Disease Risk Assessment", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn info_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {label}: "), MedicalTheme::text_secondary()),
        Span::styled(value, MedicalTheme::text()),
    ])
}

fn render_model_panels(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Model
            Constraint::Length(3), // Accuracy
            Constraint::Length(3), // Recall
            Constraint::Min(0),    // Description
        ])
        .margin(1)
        .split(area);

    let verification_style = match state.verification {
        VerificationStatus::Signed { .. } => MedicalTheme::success(),
        VerificationStatus::Unsigned => MedicalTheme::warning(),
    };

    let model_lines = vec![
        info_line("Artifact", state.artifact_name.clone()),
        info_line("Schema", state.schema.to_string()),
        info_line("Policy", state.policy.to_string()),
        info_line("Interfaces", state.capabilities.to_string()),
        Line::from(vec![
            Span::styled("  Signature: ", MedicalTheme::text_secondary()),
            Span::styled(state.verification.to_string(), verification_style),
        ]),
        info_line(
            "Training samples",
            state
                .metadata
                .training_samples
                .map_or_else(|| "n/a".to_string(), |n| n.to_string()),
        ),
    ];

    let model_block = Block::default()
        .title(Span::styled(" Model ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(model_lines).block(model_block), chunks[0]);

    render_metric(f, chunks[1], " Accuracy ", state.metadata.accuracy);
    render_metric(f, chunks[2], " Disease Recall ", state.metadata.positive_recall);

    let description = state
        .metadata
        .description
        .clone()
        .unwrap_or_else(|| "No description provided.".to_string());
    let description_block = Block::default()
        .title(Span::styled(" About ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(
        Paragraph::new(Span::styled(description, MedicalTheme::text_muted()))
            .block(description_block)
            .wrap(Wrap { trim: true }),
        chunks[3],
    );
}

fn render_metric(f: &mut Frame, area: Rect, title: &str, value: Option<f64>) {
    let block = Block::default()
        .title(Span::styled(title.to_string(), MedicalTheme::text_secondary()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    match value {
        Some(v) => {
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(MedicalTheme::info())
                .ratio(v.clamp(0.0, 1.0))
                .label(format!("{:.1}%", v * 100.0));
            f.render_widget(gauge, area);
        }
        None => {
            f.render_widget(
                Paragraph::new(Span::styled("  not reported", MedicalTheme::text_muted()))
                    .block(block),
                area,
            );
        }
    }
}

fn render_session_panels(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Session
            Constraint::Min(0),    // Quick actions
        ])
        .margin(1)
        .split(area);

    let session_lines = vec![
        info_line("Assessments this session", state.assessments.to_string()),
        Line::from(Span::styled(
            "  Patient values and results are not retained.",
            MedicalTheme::text_muted(),
        )),
    ];

    let session_block = Block::default()
        .title(Span::styled(" Session ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(session_lines).block(session_block), chunks[0]);

    let actions = vec![
        Line::from(vec![
            Span::styled("[N] ", MedicalTheme::key_hint()),
            Span::styled("New Assessment", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[Q] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ]),
    ];

    let actions_block = Block::default()
        .title(Span::styled(" Quick Actions ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(actions).block(actions_block), chunks[1]);
}

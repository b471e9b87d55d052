//! Assessment result view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::domain::{Assessment, DecisionPolicy, ImportanceReport, RiskAssessment};
use crate::tui::styles::MedicalTheme;

#[derive(Debug, Clone, Default)]
pub enum ResultState {
    #[default]
    Idle,
    Complete(Box<Assessment>),
    Error { code: &'static str, message: String },
}

pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_result_header(f, chunks[0]);
    match state {
        ResultState::Idle => render_idle(f, chunks[1]),
        ResultState::Complete(assessment) => render_assessment(f, chunks[1], assessment),
        ResultState::Error { code, message } => render_error(f, chunks[1], code, message),
    }
    render_result_footer(f, chunks[2], state);
}

fn render_result_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Risk Assessment", MedicalTheme::title()),
        Span::styled(" │ Heart Disease", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(Line::from(Span::styled(
        "No assessment yet. Press [N] to enter patient data.",
        MedicalTheme::text_muted(),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_assessment(f: &mut Frame, area: Rect, assessment: &Assessment) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Banner
            Constraint::Length(3), // Probability or class note
            Constraint::Min(0),    // Detail panels
        ])
        .split(area);

    render_banner(f, rows[0], &assessment.risk);
    render_probability(f, rows[1], &assessment.risk);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    render_factor_bars(f, left[0], assessment);
    render_importance(f, left[1], &assessment.importance);
    render_summary(f, columns[1], assessment);
}

fn render_banner(f: &mut Frame, area: Rect, risk: &RiskAssessment) {
    let banner = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("  {}  ", risk.label),
            MedicalTheme::risk_label(risk.label),
        )),
        Line::from(Span::styled(risk.label.advice(), MedicalTheme::text_secondary())),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border_focused()),
    );

    f.render_widget(banner, area);
}

fn render_probability(f: &mut Frame, area: Rect, risk: &RiskAssessment) {
    match (risk.probability, risk.policy) {
        (Some(p), DecisionPolicy::ProbabilityThreshold { threshold }) => {
            let gauge = Gauge::default()
                .block(
                    Block::default()
                        .title(Span::styled(
                            format!(" Disease Probability (HIGH RISK above {:.0}%) ", threshold * 100.0),
                            MedicalTheme::text_secondary(),
                        ))
                        .borders(Borders::ALL)
                        .border_style(MedicalTheme::border()),
                )
                .gauge_style(MedicalTheme::risk_label(risk.label))
                .ratio(p.clamp(0.0, 1.0))
                .label(format!("{:.1}%", p * 100.0));
            f.render_widget(gauge, area);
        }
        _ => {
            let note = Paragraph::new(Line::from(Span::styled(
                "Class prediction only: this model does not provide probability estimates",
                MedicalTheme::warning(),
            )))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(MedicalTheme::border()),
            );
            f.render_widget(note, area);
        }
    }
}

fn bar(ratio: f64, width: usize) -> String {
    let filled = (ratio.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn render_factor_bars(f: &mut Frame, area: Rect, assessment: &Assessment) {
    let lines: Vec<Line> = assessment
        .profile
        .bars
        .iter()
        .map(|b| {
            Line::from(vec![
                Span::styled(format!(" {:<20}", b.label), MedicalTheme::text_secondary()),
                Span::styled(bar(b.value, 20), MedicalTheme::risk_bar(b.value)),
                Span::styled(format!(" {:>3.0}%", b.value * 100.0), MedicalTheme::text()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Risk Factors ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_importance(f: &mut Frame, area: Rect, report: &ImportanceReport) {
    let block = Block::default()
        .title(Span::styled(" Feature Importance ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    let lines: Vec<Line> = match report {
        ImportanceReport::Available { .. } => report
            .ranked()
            .into_iter()
            .map(|(w, rel)| {
                Line::from(vec![
                    Span::styled(
                        format!(" {:<20}", w.feature.display_name()),
                        MedicalTheme::text_secondary(),
                    ),
                    Span::styled(bar(rel, 20), MedicalTheme::coefficient(w.coefficient)),
                    Span::styled(format!(" {:+.3}", w.coefficient), MedicalTheme::text()),
                ])
            })
            .collect(),
        ImportanceReport::Unavailable { reason } => vec![
            Line::from(Span::styled(
                "Degraded mode: feature importance unavailable",
                MedicalTheme::warning(),
            )),
            Line::from(Span::styled(reason.clone(), MedicalTheme::text_muted())),
        ],
    };

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_summary(f: &mut Frame, area: Rect, assessment: &Assessment) {
    let rows = assessment.profile.summary.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.feature.display_name()).style(MedicalTheme::text_secondary()),
            Cell::from(r.value.clone()).style(MedicalTheme::text()),
            Cell::from(match &r.detail {
                Some(detail) => format!("{} ({detail})", r.level),
                None => r.level.to_string(),
            })
            .style(MedicalTheme::factor_level(r.level)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(38),
            Constraint::Percentage(37),
            Constraint::Percentage(25),
        ],
    )
    .header(
        Row::new(vec!["Factor", "Value", "Level"])
            .style(MedicalTheme::header())
            .bottom_margin(1),
    )
    .block(
        Block::default()
            .title(Span::styled(" Patient Summary ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(table, area);
}

fn render_error(f: &mut Frame, area: Rect, code: &str, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(format!("! {code}"), MedicalTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message, MedicalTheme::text())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(MedicalTheme::danger()),
    );

    f.render_widget(content, area);
}

fn render_result_footer(f: &mut Frame, area: Rect, state: &ResultState) {
    let content = match state {
        ResultState::Error { .. } => Line::from(vec![
            Span::styled("[Enter] ", MedicalTheme::key_hint()),
            Span::styled("Edit Input ", MedicalTheme::key_desc()),
            Span::styled("[Esc] ", MedicalTheme::key_hint()),
            Span::styled("Dashboard", MedicalTheme::key_desc()),
        ]),
        _ => Line::from(vec![
            Span::styled("[N] ", MedicalTheme::key_hint()),
            Span::styled("New Assessment ", MedicalTheme::key_desc()),
            Span::styled("[Esc] ", MedicalTheme::key_hint()),
            Span::styled("Dashboard", MedicalTheme::key_desc()),
        ]),
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_width_is_fixed() {
        assert_eq!(bar(0.0, 10).chars().count(), 10);
        assert_eq!(bar(0.5, 10), "█████░░░░░");
        assert_eq!(bar(1.7, 10), "██████████");
    }
}

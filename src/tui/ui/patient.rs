//! Patient data input form.
//!
//! One control per schema feature. Numeric fields behave like sliders
//! (Left/Right step within bounds) and also accept typed digits; categorical
//! fields cycle through their label table.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{Feature, FeatureKind, FeatureSchema, RawInput, RawValue};
use crate::tui::styles::MedicalTheme;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldControl {
    Numeric {
        value: f64,
        min: f64,
        max: f64,
        step: f64,
        /// Whether the column is integer-valued.
        integer: bool,
        /// Digits typed but not yet committed.
        entry: String,
    },
    Choice {
        labels: &'static [&'static str],
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub feature: Feature,
    pub control: FieldControl,
}

impl FormField {
    #[must_use]
    pub fn new(feature: Feature) -> Self {
        let control = match feature.kind() {
            FeatureKind::Integer { min, max } => FieldControl::Numeric {
                value: feature.default_value().unwrap_or(min as f64),
                min: min as f64,
                max: max as f64,
                step: 1.0,
                integer: true,
                entry: String::new(),
            },
            FeatureKind::Float { min, max } => FieldControl::Numeric {
                value: feature.default_value().unwrap_or(min),
                min,
                max,
                step: 0.1,
                integer: false,
                entry: String::new(),
            },
            FeatureKind::Categorical { labels } => FieldControl::Choice { labels, index: 0 },
        };
        Self { feature, control }
    }

    /// Slider step or choice cycle; `direction` is +1 or -1.
    pub fn adjust(&mut self, direction: i32) {
        match &mut self.control {
            FieldControl::Numeric {
                value,
                min,
                max,
                step,
                integer,
                entry,
            } => {
                entry.zeroize();
                let next = *value + f64::from(direction) * *step;
                // Round off accumulated float error from repeated 0.1 steps.
                let next = if *integer {
                    next.round()
                } else {
                    (next * 10.0).round() / 10.0
                };
                *value = next.clamp(*min, *max);
            }
            FieldControl::Choice { labels, index } => {
                let len = labels.len();
                *index = if direction >= 0 {
                    (*index + 1) % len
                } else {
                    (*index + len - 1) % len
                };
            }
        }
    }

    /// Text shown in the control.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.control {
            FieldControl::Numeric { entry, .. } if !entry.is_empty() => entry.clone(),
            FieldControl::Numeric { value, integer, .. } => {
                let unit = self.feature.unit();
                let number = if *integer {
                    format!("{value:.0}")
                } else {
                    format!("{value:.1}")
                };
                if unit.is_empty() {
                    number
                } else {
                    format!("{number} {unit}")
                }
            }
            FieldControl::Choice { labels, index } => labels[*index].to_string(),
        }
    }

    /// Range or option count hint.
    #[must_use]
    pub fn hint(&self) -> String {
        match &self.control {
            FieldControl::Numeric {
                min, max, integer, ..
            } => {
                if *integer {
                    format!("{min:.0}-{max:.0}  [←→] adjust, digits to type")
                } else {
                    format!("{min:.1}-{max:.1}  [←→] adjust, digits to type")
                }
            }
            FieldControl::Choice { labels, index } => {
                format!("{}/{}  [←→] change", index + 1, labels.len())
            }
        }
    }

    fn raw_value(&self) -> Result<RawValue, String> {
        match &self.control {
            FieldControl::Numeric {
                value,
                min,
                max,
                integer,
                entry,
                ..
            } => {
                let v = if entry.is_empty() {
                    *value
                } else {
                    let parsed: f64 = entry.parse().map_err(|_| {
                        format!("{}: Invalid number", self.feature.display_name())
                    })?;
                    if parsed < *min || parsed > *max {
                        return Err(format!(
                            "{}: Value must be between {min} and {max}",
                            self.feature.display_name()
                        ));
                    }
                    parsed
                };
                if *integer {
                    if v.fract() != 0.0 {
                        return Err(format!(
                            "{}: Whole numbers only",
                            self.feature.display_name()
                        ));
                    }
                    Ok(RawValue::Integer(v as i64))
                } else {
                    Ok(RawValue::Float(v))
                }
            }
            FieldControl::Choice { labels, index } => Ok(RawValue::Label(labels[*index].to_string())),
        }
    }
}

/// Patient form state
pub struct PatientFormState {
    pub schema: FeatureSchema,
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl PatientFormState {
    #[must_use]
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            fields: schema.features().iter().copied().map(FormField::new).collect(),
            selected_field: 0,
            error_message: None,
        }
    }

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    pub fn increment(&mut self) {
        self.fields[self.selected_field].adjust(1);
        self.error_message = None;
    }

    pub fn decrement(&mut self) {
        self.fields[self.selected_field].adjust(-1);
        self.error_message = None;
    }

    /// Type into a numeric field. Ignored on choice fields.
    pub fn input_char(&mut self, c: char) {
        if !(c.is_ascii_digit() || c == '.') {
            return;
        }
        if let FieldControl::Numeric { entry, .. } = &mut self.fields[self.selected_field].control {
            entry.push(c);
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        if let FieldControl::Numeric { entry, .. } = &mut self.fields[self.selected_field].control {
            entry.pop();
        }
    }

    /// Collect the form into a raw submission.
    ///
    /// # Errors
    /// Returns a user-facing message for the first invalid typed entry.
    pub fn to_raw_input(&self) -> Result<RawInput, String> {
        let mut input = RawInput::new();
        for field in &self.fields {
            input.insert(field.feature.name(), field.raw_value()?);
        }
        Ok(input)
    }

    /// Wipe typed buffers and reset every control to its default.
    pub fn clear_sensitive(&mut self) {
        for field in &mut self.fields {
            if let FieldControl::Numeric { entry, .. } = &mut field.control {
                entry.zeroize();
            }
            *field = FormField::new(field.feature);
        }
        self.error_message = None;
        self.selected_field = 0;
    }

    /// Load a typical patient for demonstration.
    pub fn load_sample_data(&mut self) {
        for field in &mut self.fields {
            let target = match field.feature {
                Feature::Age => "58",
                Feature::Sex => "Male",
                Feature::Cp => "Type 3: Asymptomatic",
                Feature::Trestbps => "140",
                Feature::Chol => "289",
                Feature::Fbs => "No",
                Feature::Restecg => "LV Hypertrophy",
                Feature::Thalch => "132",
                Feature::Exang => "Yes",
                Feature::Oldpeak => "1.8",
                Feature::Slope => "Flat",
                Feature::Ca => "1",
                Feature::Thal => "Reversible Defect",
            };
            match &mut field.control {
                FieldControl::Numeric { value, entry, .. } => {
                    entry.zeroize();
                    if let Ok(v) = target.parse() {
                        *value = v;
                    }
                }
                FieldControl::Choice { labels, index } => {
                    *index = labels.iter().position(|l| *l == target).unwrap_or(0);
                }
            }
        }
        self.error_message = None;
    }
}

/// Render the patient data input form
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0], state.schema);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect, schema: FeatureSchema) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Patient Data Entry", MedicalTheme::title()),
        Span::styled(format!(" │ {schema} schema"), MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = state.fields.len().div_ceil(2);

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(f, columns[1], &state.fields[mid..], mid, state.selected_field);
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (MedicalTheme::border_focused(), MedicalTheme::focused())
        } else {
            (MedicalTheme::border(), MedicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(
                format!(" {} ", field.feature.display_name()),
                title_style,
            ))
            .borders(Borders::ALL)
            .border_style(border_style);

        let mut spans = vec![
            Span::raw(" "),
            Span::styled(field.display(), MedicalTheme::text()),
        ];
        if is_selected {
            spans.push(Span::styled("▌", MedicalTheme::cursor()));
            spans.push(Span::styled(format!("  {}", field.hint()), MedicalTheme::text_muted()));
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", MedicalTheme::danger()),
            Span::styled(err.clone(), MedicalTheme::danger()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", MedicalTheme::key_hint()),
            Span::styled("Navigate ", MedicalTheme::key_desc()),
            Span::styled("[←→] ", MedicalTheme::key_hint()),
            Span::styled("Adjust ", MedicalTheme::key_desc()),
            Span::styled("[Enter] ", MedicalTheme::key_hint()),
            Span::styled("Assess ", MedicalTheme::key_desc()),
            Span::styled("[S] ", MedicalTheme::key_hint()),
            Span::styled("Sample Data ", MedicalTheme::key_desc()),
            Span::styled("[Esc] ", MedicalTheme::key_hint()),
            Span::styled("Cancel", MedicalTheme::key_desc()),
        ])
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

    fn select(state: &mut PatientFormState, feature: Feature) {
        state.selected_field = state
            .fields
            .iter()
            .position(|f| f.feature == feature)
            .expect("field present");
    }

    #[test]
    fn test_defaults_produce_valid_reduced_input() {
        let state = PatientFormState::new(FeatureSchema::Reduced);
        let input = state.to_raw_input().expect("Should build input");

        assert_eq!(input.len(), 6);
        assert_eq!(input.get("age"), Some(&RawValue::Integer(45)));
        assert_eq!(input.get("chol"), Some(&RawValue::Integer(250)));
        assert_eq!(input.get("thalch"), Some(&RawValue::Integer(150)));
        assert_eq!(input.get("sex"), Some(&RawValue::Label("Male".into())));
        assert_eq!(
            input.get("cp"),
            Some(&RawValue::Label("Type 0: Typical Angina".into()))
        );
    }

    #[test]
    fn test_full_schema_has_thirteen_controls() {
        let state = PatientFormState::new(FeatureSchema::Full);
        let input = state.to_raw_input().expect("Should build input");
        assert_eq!(input.len(), 13);
        assert_eq!(input.get("oldpeak"), Some(&RawValue::Float(1.0)));
        assert_eq!(input.get("ca"), Some(&RawValue::Integer(0)));
    }

    #[test]
    fn test_slider_steps_and_clamps() {
        let mut state = PatientFormState::new(FeatureSchema::Reduced);
        select(&mut state, Feature::Age);
        state.increment();
        assert_eq!(state.fields[0].display(), "46 years");

        for _ in 0..100 {
            state.increment();
        }
        let input = state.to_raw_input().expect("Should build input");
        assert_eq!(input.get("age"), Some(&RawValue::Integer(80)));
    }

    #[test]
    fn test_float_slider_has_no_drift() {
        let mut state = PatientFormState::new(FeatureSchema::Full);
        select(&mut state, Feature::Oldpeak);
        for _ in 0..3 {
            state.increment();
        }
        let input = state.to_raw_input().expect("Should build input");
        assert_eq!(input.get("oldpeak"), Some(&RawValue::Float(1.3)));
    }

    #[test]
    fn test_choice_cycles_both_ways() {
        let mut state = PatientFormState::new(FeatureSchema::Reduced);
        select(&mut state, Feature::Cp);
        state.decrement();
        assert_eq!(state.fields[state.selected_field].display(), "Type 3: Asymptomatic");
        state.increment();
        assert_eq!(state.fields[state.selected_field].display(), "Type 0: Typical Angina");
    }

    #[test]
    fn test_typed_entry_is_validated() {
        let mut state = PatientFormState::new(FeatureSchema::Reduced);
        select(&mut state, Feature::Chol);
        state.input_char('3');
        state.input_char('1');
        state.input_char('0');
        let input = state.to_raw_input().expect("Should build input");
        assert_eq!(input.get("chol"), Some(&RawValue::Integer(310)));

        state.input_char('0');
        assert!(state.to_raw_input().is_err());
    }

    #[test]
    fn test_clear_sensitive_resets_controls() {
        let mut state = PatientFormState::new(FeatureSchema::Reduced);
        state.load_sample_data();
        select(&mut state, Feature::Chol);
        state.input_char('9');
        state.clear_sensitive();

        assert_eq!(state.selected_field, 0);
        assert_eq!(state.fields, PatientFormState::new(FeatureSchema::Reduced).fields);
    }

    #[test]
    fn test_sample_data_is_valid() {
        let mut state = PatientFormState::new(FeatureSchema::Full);
        state.load_sample_data();
        let input = state.to_raw_input().expect("Should build input");
        assert_eq!(input.get("thal"), Some(&RawValue::Label("Reversible Defect".into())));
        assert_eq!(input.get("exang"), Some(&RawValue::Label("Yes".into())));
    }
}

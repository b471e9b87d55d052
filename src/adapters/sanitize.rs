//! Log redaction for clinical values and key material.
//!
//! Every formatted log line passes through [`SanitizingMakeWriter`] before it
//! reaches the sink. Redacted categories:
//! - clinical `field=value` pairs (`age=45`, `chol: 250`, `"thalch": 150`)
//! - identifiers (UUIDs, SSN-like and MRN-like numbers, emails, phones)
//! - signing seeds and other long hex/base64 secrets
//!
//! Call sites should still log counts and codes rather than values; this is
//! the fallback when a value slips into a message or an error string.
//!
//! Input is capped (see `HEARTRISK_SANITIZE_MAX_BYTES`) so a huge line cannot
//! stall the writer.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<RedactionPatterns> = OnceLock::new();
static ANSI_ESCAPE: OnceLock<Regex> = OnceLock::new();

/// Default per-call sanitize budget (16 KiB).
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct RedactionPattern {
    regex: Regex,
    replacement: &'static str,
}

struct RedactionPatterns {
    set: RegexSet,
    patterns: Vec<RedactionPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEARTRISK_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn patterns() -> &'static RedactionPatterns {
    PATTERNS.get_or_init(|| {
        let rules: Vec<(&'static str, &'static str)> = vec![
            // Clinical fields; the field name is kept, the value dropped.
            (
                r#"(?i)(\b"?(?:age|sex|cp|trestbps|chol|fbs|restecg|thalch|exang|oldpeak|slope|ca|thal)"?\s*[:=]\s*)(?:"[^"]{0,64}"|[A-Za-z0-9.+-]+)"#,
                "${1}[REDACTED]",
            ),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
            (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
                "[REDACTED-PHONE]",
            ),
            (
                r"(?i)\b(?:secret|password|private[_-]?key|seed|signing[_-]?key|token)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}",
                "[REDACTED-SECRET]",
            ),
            (r"\b[0-9a-fA-F]{64,}\b", "[REDACTED-KEY]"),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| RedactionPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        RedactionPatterns { set, patterns }
    })
}

/// Terminal styling splits `chol=287` into escape-wrapped pieces, so it is
/// removed before any rule runs.
fn strip_ansi(input: &str) -> std::borrow::Cow<'_, str> {
    ANSI_ESCAPE
        .get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("Valid regex"))
        .replace_all(input, "")
}

/// Redact sensitive values in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let compiled = patterns();
    let plain = strip_ansi(input);
    let (prefix, truncated) = truncate_to_char_boundary(&plain, max_bytes);

    let mut result = prefix.to_string();
    for idx in compiled.set.matches(prefix).into_iter() {
        let pattern = &compiled.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether `input` would be altered by [`sanitize`].
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let plain = strip_ansi(input);
    let (prefix, _) = truncate_to_char_boundary(&plain, max_sanitize_bytes());
    patterns().set.is_match(prefix)
}

/// `MakeWriter` wrapper that sanitizes each formatted line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A single line with no newline must not buffer without bound.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("Should lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("Should lock")).into_owned()
        }
    }

    #[test]
    fn test_clinical_fields_are_redacted() {
        let sanitized = sanitize("submission age=45 chol: 250 \"thalch\": 150 exang=\"No\"");
        assert!(!sanitized.contains("45"));
        assert!(!sanitized.contains("250"));
        assert!(!sanitized.contains("150"));
        assert!(!sanitized.contains("\"No\""));
        assert!(sanitized.contains("age=[REDACTED]"));
        assert!(sanitized.contains("chol: [REDACTED]"));
    }

    #[test]
    fn test_counts_and_codes_survive() {
        let line = "Assessment complete label=HIGH_RISK features=6 policy=probability_threshold";
        assert_eq!(sanitize(line), line);
        assert!(!contains_sensitive(line));
    }

    #[test]
    fn test_identifiers_are_redacted() {
        let sanitized = sanitize("Patient 550e8400-e29b-41d4-a716-446655440000 SSN 123-45-6789");
        assert!(sanitized.contains("[REDACTED-UUID]"));
        assert!(sanitized.contains("[REDACTED-SSN]"));
        assert!(sanitize("Contact: patient@hospital.com").contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_seed_material_is_redacted() {
        let hex = "0123456789abcdef".repeat(4);
        assert!(sanitize(&format!("seed {hex}")).contains("[REDACTED-KEY]"));

        let b64 = "seed=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0IHZhbHVl";
        assert!(sanitize(b64).contains("[REDACTED-SECRET]"));
    }

    #[test]
    fn test_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("é".repeat(100).as_str(), 15);
        assert!(sanitized.ends_with(" [TRUNCATED]"));
    }

    #[test]
    fn test_writer_sanitizes_lines() {
        let mut out = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut out);
            writer.write_all(b"first chol=300\nsecond ").expect("write");
            writer.write_all(b"age=61\n").expect("write");
            writer.flush().expect("flush");
        }
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "first chol=[REDACTED]\nsecond age=[REDACTED]\n");
    }

    #[test]
    fn test_ansi_styled_fields_are_redacted() {
        let styled = "\u{1b}[3mchol\u{1b}[0m\u{1b}[2m=\u{1b}[0m287 \u{1b}[3mage\u{1b}[0m\u{1b}[2m=\u{1b}[0m61";
        let sanitized = sanitize(styled);
        assert!(!sanitized.contains("287"));
        assert!(!sanitized.contains("61"));
        assert!(contains_sensitive(styled));
    }

    #[test]
    fn test_structured_fields_through_fmt_layer_are_redacted() {
        let buf = SharedBuf::default();
        let sink = buf.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .without_time()
                .with_writer(SanitizingMakeWriter::new(move || sink.clone())),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(chol = 287, age = 61, thalch = 142, "Submission received");
        });

        let text = buf.contents();
        assert!(text.contains("Submission received"));
        assert!(!text.contains("287"), "cholesterol in log: {text:?}");
        assert!(!text.contains("61"), "age in log: {text:?}");
        assert!(!text.contains("142"), "max heart rate in log: {text:?}");
    }
}

//! Log redaction for patient identifiers.
//!
//! Log statements in this crate reference row ids and counts only, but
//! error messages can echo stored values (a malformed date, an unexpected
//! enum text). Every formatted line is passed through [`redact`] before it
//! reaches the log sink:
//! - medical record numbers (`MRN 123456`, `MRN-00042`, ...)
//! - calendar dates (admission, listing and dialysis-start dates)
//! - email addresses and phone numbers
//! - SSN-shaped numbers
//!
//! Input longer than `KIDNEY_MATCH_REDACT_MAX_BYTES` (default 16 KiB) is
//! truncated before scanning.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_REDACT_MAX_BYTES: usize = 16 * 1024;

static RULES: OnceLock<RedactionRules> = OnceLock::new();

struct RedactionRules {
    any: RegexSet,
    rules: Vec<(Regex, &'static str)>,
}

const PATTERNS: [(&str, &str); 5] = [
    (r"(?i)\bMRN\b[\s:#-]*[A-Z0-9-]*\d[A-Z0-9-]*", "[REDACTED-MRN]"),
    (r"\b\d{4}-\d{2}-\d{2}\b", "[REDACTED-DATE]"),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
    (
        r"\b(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b",
        "[REDACTED-PHONE]",
    ),
];

fn rules() -> &'static RedactionRules {
    RULES.get_or_init(|| {
        let any = RegexSet::new(PATTERNS.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let rules = PATTERNS
            .iter()
            .map(|(pattern, replacement)| (Regex::new(pattern).expect("Valid regex"), *replacement))
            .collect();
        RedactionRules { any, rules }
    })
}

fn max_redact_bytes() -> usize {
    std::env::var("KIDNEY_MATCH_REDACT_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_REDACT_MAX_BYTES)
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

/// Replace identifier-shaped substrings with placeholders.
#[must_use]
pub fn redact(input: &str) -> String {
    redact_with_limit(input, max_redact_bytes())
}

fn redact_with_limit(input: &str, max_bytes: usize) -> String {
    let rules = rules();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in rules.any.matches(prefix).iter() {
        let (regex, replacement) = &rules.rules[idx];
        result = regex.replace_all(&result, *replacement).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether `input` contains anything [`redact`] would replace.
#[must_use]
pub fn contains_identifier(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, max_redact_bytes());
    rules().any.is_match(prefix)
}

/// A `tracing_subscriber` writer that redacts each formatted line before
/// handing it to the wrapped sink.
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct RedactingWriter<W: std::io::Write> {
    inner: W,
    buffer: Vec<u8>,
    max_bytes: usize,
}

impl<W: std::io::Write> RedactingWriter<W> {
    fn with_limit(inner: W, max_bytes: usize) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            max_bytes,
        }
    }

    fn write_redacted(&mut self, line: &[u8], newline: bool) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(line);
        self.inner
            .write_all(redact_with_limit(&text, self.max_bytes).as_bytes())?;
        if newline {
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_complete_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            // Redact without the newline so truncation cannot drop it.
            self.write_redacted(&line[..pos], true)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.write_complete_lines()?;

        // A single line without newlines must not grow without bound.
        if self.buffer.len() > self.max_bytes.saturating_mul(2) {
            let pending = std::mem::take(&mut self.buffer);
            self.write_redacted(&pending, true)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.write_complete_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_redacted(&pending, false)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::with_limit(self.inner.make_writer(), max_redact_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_redact_mrn_forms() {
        for input in ["MRN 12345678", "mrn:A-0042", "MRN-00042 loaded"] {
            let redacted = redact(input);
            assert!(redacted.contains("[REDACTED-MRN]"), "{input} -> {redacted}");
        }
    }

    #[test]
    fn test_redact_dates() {
        let redacted = redact("invalid dod: \"2019-04-01 10:00\": trailing input");
        assert!(redacted.contains("[REDACTED-DATE]"));
        assert!(!redacted.contains("2019-04-01"));
    }

    #[test]
    fn test_redact_contact_details() {
        let redacted = redact("contact nurse@hospital.org or 555-123-4567");
        assert!(redacted.contains("[REDACTED-EMAIL]"));
        assert!(redacted.contains("[REDACTED-PHONE]"));
    }

    #[test]
    fn test_plain_log_lines_untouched() {
        let line = "Loaded 12 donors (0 rejected)";
        assert!(!contains_identifier(line));
        assert_eq!(redact(line), line);
        assert!(contains_identifier("SSN 123-45-6789"));
    }

    #[test]
    fn test_truncation_marks_output() {
        let redacted = redact_with_limit("recipient row 42 rejected", 8);
        assert!(redacted.ends_with("[TRUNCATED]"));
    }

    #[test]
    fn test_writer_redacts_complete_lines() {
        let mut sink = Vec::new();
        {
            let mut writer = RedactingWriter::with_limit(&mut sink, DEFAULT_REDACT_MAX_BYTES);
            writer
                .write_all(b"row 3: bad date 2020-01-31\npartial MRN 99")
                .expect("Should write");
        }
        let out = String::from_utf8(sink).expect("Should be utf8");
        assert!(out.contains("row 3: bad date [REDACTED-DATE]\n"));
        assert!(out.contains("partial [REDACTED-MRN]"));
    }

    #[test]
    fn test_writer_keeps_newline_on_truncated_lines() {
        let mut sink = Vec::new();
        {
            let mut writer = RedactingWriter::with_limit(&mut sink, 8);
            writer
                .write_all(b"donor row 7 rejected\nrow 8\n")
                .expect("Should write");
        }
        let out = String::from_utf8(sink).expect("Should be utf8");
        assert_eq!(out, "donor ro [TRUNCATED]\nrow 8\n");
    }

    #[test]
    fn test_writer_flushes_oversized_unterminated_line() {
        let mut sink = Vec::new();
        {
            let mut writer = RedactingWriter::with_limit(&mut sink, 4);
            writer.write_all(b"abcdefghij").expect("Should write");
        }
        let out = String::from_utf8(sink).expect("Should be utf8");
        assert_eq!(out, "abcd [TRUNCATED]\n");
    }
}

//! Output layer: reply documents to stdout, CLI errors to stderr.
//!
//! Reply documents are always JSON. [`OutputMode`] only picks between
//! indented output for humans and one-line output for pipes and agents.

use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Indented JSON, human-readable errors.
    Pretty,
    /// Single-line JSON for documents and errors alike.
    Compact,
}

impl OutputMode {
    pub const fn from_compact_flag(compact: bool) -> Self {
        if compact { Self::Compact } else { Self::Pretty }
    }

    pub const fn is_compact(self) -> bool {
        matches!(self, Self::Compact)
    }
}

/// Write `value` as JSON followed by a newline.
pub fn write_json<T: Serialize>(w: &mut dyn Write, mode: OutputMode, value: &T) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => serde_json::to_writer_pretty(&mut *w, value)?,
        OutputMode::Compact => serde_json::to_writer(&mut *w, value)?,
    }
    writeln!(w)
}

/// Render a document to stdout.
pub fn render<T: Serialize>(mode: OutputMode, value: &T) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_json(&mut out, mode, value)?;
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable code, e.g. `"unauthenticated"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

fn write_error(w: &mut dyn Write, mode: OutputMode, error: &CliError) -> io::Result<()> {
    match mode {
        OutputMode::Compact => {
            serde_json::to_writer(&mut *w, &serde_json::json!({ "error": error }))?;
            writeln!(w)
        }
        OutputMode::Pretty => {
            writeln!(w, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(w, "  suggestion: {suggestion}")?;
            }
            Ok(())
        }
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_text(mode: OutputMode, value: &serde_json::Value) -> String {
        let mut buf = Vec::new();
        write_json(&mut buf, mode, value).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn error_text(mode: OutputMode, error: &CliError) -> String {
        let mut buf = Vec::new();
        write_error(&mut buf, mode, error).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn compact_flag_selects_mode() {
        assert!(OutputMode::from_compact_flag(true).is_compact());
        assert_eq!(OutputMode::from_compact_flag(false), OutputMode::Pretty);
    }

    #[test]
    fn compact_documents_are_one_line() {
        let value = serde_json::json!({ "projects": [{ "id": 1 }] });
        let text = json_text(OutputMode::Compact, &value);
        assert_eq!(text, "{\"projects\":[{\"id\":1}]}\n");
    }

    #[test]
    fn pretty_documents_are_indented() {
        let value = serde_json::json!({ "found": false });
        let text = json_text(OutputMode::Pretty, &value);
        assert_eq!(text, "{\n  \"found\": false\n}\n");
    }

    #[test]
    fn pretty_error_with_suggestion() {
        let error = CliError::with_details("no API key", "pass --api-key", "unauthenticated");
        let text = error_text(OutputMode::Pretty, &error);
        assert_eq!(text, "error: no API key\n  suggestion: pass --api-key\n");
    }

    #[test]
    fn compact_error_is_wrapped_json() {
        let text = error_text(OutputMode::Compact, &CliError::new("boom"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({ "error": { "message": "boom" } }));
    }
}

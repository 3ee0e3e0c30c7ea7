//! Structured diagnostics collected during batch processing and transforms.
//!
//! The core never aborts a batch for a single bad document and never lets a
//! transform raise past its call. Instead every recovered failure becomes a
//! [`Diagnostic`] the caller can render, so there is no hidden global state
//! beyond ordinary `tracing` output.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational, e.g. row counts after a filter.
    Info,
    /// Recovered problem, e.g. a transform that returned its input unchanged.
    Warning,
    /// A document that had to be skipped.
    Error,
}

/// One structured diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// What the entry is about: a source filename, a column name, a field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            context: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            context: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.context {
            Some(ctx) => write!(f, "[{tag}] {}: {}", ctx, self.message),
            None => write!(f, "[{tag}] {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_context() {
        let diag = Diagnostic::error("malformed XML").with_context("nota_42.xml");
        assert_eq!(diag.to_string(), "[error] nota_42.xml: malformed XML");
    }

    #[test]
    fn test_serializes_without_null_context() {
        let diag = Diagnostic::warning("column not found");
        let json = serde_json::to_string(&diag).unwrap();
        assert_eq!(
            json,
            r#"{"severity":"warning","message":"column not found"}"#
        );
    }
}

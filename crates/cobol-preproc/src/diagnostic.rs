//! Non-fatal diagnostic records.
//!
//! Recoverable conditions are accumulated during preprocessing and handed
//! to the caller alongside the output token stream. Each record carries a
//! closed [`DiagnosticKind`], a severity, a human-readable message, and
//! the span of the source that triggered it.

use std::fmt;

use cobol_preproc_core::Span;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Warning — preprocessing continued but something looks wrong.
    Warning,
    /// Informational — not a problem, but worth surfacing.
    Info,
}

/// The closed set of recoverable conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `REPLACE OFF` with no open REPLACE region; treated as a no-op.
    UnmatchedReplaceOff,
    /// A REPLACE region still open at end of unit; implicitly closed.
    DanglingReplaceScope,
    /// A `COPY ... SUPPRESS` whose expansion was resolved but not emitted.
    SuppressedCopy,
    /// Multiple qualified rules in one scope matched the same copy origin;
    /// the first-declared rule was used.
    AmbiguousRuleQualifier,
}

/// A diagnostic produced while preprocessing one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Which recoverable condition occurred.
    pub kind: DiagnosticKind,
    /// Severity of the record.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Source location of the triggering directive or text.
    pub span: Span,
}

impl Diagnostic {
    /// Create a warning diagnostic.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    /// Create an info diagnostic.
    pub fn info(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            severity: Severity::Info,
            message: message.into(),
            span,
        }
    }

    /// Returns `true` if this diagnostic is a warning.
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnmatchedReplaceOff => "unmatched-replace-off",
            DiagnosticKind::DanglingReplaceScope => "dangling-replace-scope",
            DiagnosticKind::SuppressedCopy => "suppressed-copy",
            DiagnosticKind::AmbiguousRuleQualifier => "ambiguous-rule-qualifier",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_constructor() {
        let d = Diagnostic::warning(
            DiagnosticKind::UnmatchedReplaceOff,
            "REPLACE OFF without a matching REPLACE",
            Span::main(0, 11),
        );
        assert!(d.is_warning());
        assert_eq!(d.kind, DiagnosticKind::UnmatchedReplaceOff);
    }

    #[test]
    fn test_info_constructor() {
        let d = Diagnostic::info(DiagnosticKind::SuppressedCopy, "copy suppressed", Span::main(0, 4));
        assert!(!d.is_warning());
        assert_eq!(d.severity, Severity::Info);
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::warning(
            DiagnosticKind::DanglingReplaceScope,
            "REPLACE still active at end of unit",
            Span::main(0, 7),
        );
        assert_eq!(
            d.to_string(),
            "warning[dangling-replace-scope]: REPLACE still active at end of unit"
        );
    }
}

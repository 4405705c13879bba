//! Preprocessor error types.
//!
//! Fatal conditions abort resolution of the current compilation unit and
//! surface as a single terminal [`PreprocessError`]. Recoverable
//! conditions (unmatched `REPLACE OFF`, dangling scopes, suppressed
//! copies) never appear here; they become [`Diagnostic`](crate::Diagnostic)
//! records and resolution continues.

use cobol_preproc_core::Span;
use thiserror::Error;

use crate::exec::ExecKind;

/// Result type for preprocessor operations.
pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Errors that abort resolution of a compilation unit.
#[derive(Debug, Clone, Error)]
pub enum PreprocessError {
    /// A copybook named by a COPY statement could not be resolved.
    #[error("copybook '{name}' could not be resolved")]
    CopybookNotFound {
        name: String,
        library: Option<String>,
        span: Span,
    },

    /// A copybook directly or transitively copies itself.
    #[error("cyclic COPY of '{name}'")]
    CyclicCopy {
        name: String,
        library: Option<String>,
        span: Span,
    },

    /// COPY nesting went past the configured limit.
    #[error("COPY nesting exceeds the maximum depth of {max}")]
    CopyDepthExceeded { max: usize, span: Span },

    /// A CBL/PROCESS statement named an option outside the closed set.
    #[error("unknown compiler option '{option}'")]
    UnknownDirective { option: String, span: Span },

    /// An empty or unterminated `==...==` pattern.
    #[error("malformed pseudo-text: {message}")]
    MalformedPseudoText { message: String, span: Span },

    /// An EXEC block reached end of unit without END-EXEC.
    #[error("EXEC {kind} block is missing END-EXEC")]
    UnterminatedExec { kind: ExecKind, span: Span },

    /// A COPY/REPLACE/CBL statement that cannot be parsed.
    #[error("malformed {statement} statement: {message}")]
    MalformedStatement {
        statement: &'static str,
        message: String,
        span: Span,
    },

    /// The copybook lookup reported cancellation; the unit is abandoned.
    #[error("copybook lookup was cancelled")]
    Canceled,

    /// The copybook lookup failed for a reason other than absence.
    #[error("copybook lookup failed: {0}")]
    Lookup(String),
}

impl PreprocessError {
    /// Span of the source that triggered the error, where one exists.
    pub fn span(&self) -> Option<Span> {
        match self {
            PreprocessError::CopybookNotFound { span, .. }
            | PreprocessError::CyclicCopy { span, .. }
            | PreprocessError::CopyDepthExceeded { span, .. }
            | PreprocessError::UnknownDirective { span, .. }
            | PreprocessError::MalformedPseudoText { span, .. }
            | PreprocessError::UnterminatedExec { span, .. }
            | PreprocessError::MalformedStatement { span, .. } => Some(*span),
            PreprocessError::Canceled | PreprocessError::Lookup(_) => None,
        }
    }
}

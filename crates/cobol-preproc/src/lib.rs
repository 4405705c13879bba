//! COBOL preprocessing front end.
//!
//! Resolves the compiler-directing statements that rewrite a compilation
//! unit before the grammar proper ever sees it:
//!
//! - `COPY name [OF|IN lib] [SUPPRESS] [REPLACING ...]` — copybook
//!   inclusion, recursive, with one-shot pseudo-text substitution;
//! - `REPLACE ... .` / `REPLACE OFF .` — scoped pseudo-text substitution
//!   over everything between the two statements, copies included;
//! - `CBL` / `PROCESS` — compiler option statements, merged into one
//!   serializable [`CompilerOptionSet`];
//! - `EXEC CICS|SQL|SQLIMS ... END-EXEC` — embedded-language blocks,
//!   passed through (CICS/SQLIMS opaque, SQL dispatched so its copybook
//!   includes resolve);
//! - `EJECT`, `SKIP1/2/3`, `TITLE` — listing directives, consumed.
//!
//! The pipeline is line conditioning ([`source`]), classification
//! ([`classify`]), then directive resolution ([`preprocessor`]). The
//! output is a flat token stream plus options and diagnostics; copybook
//! content is fetched through the caller-supplied [`CopybookLookup`].
//!
//! ```
//! use cobol_preproc::{MemoryLookup, Preprocessor, SourceFormat};
//!
//! let mut lookup = MemoryLookup::new();
//! lookup.insert("GREET", None, "DISPLAY 'HELLO'.");
//! let unit = Preprocessor::new(&lookup)
//!     .with_format(SourceFormat::Free)
//!     .preprocess("COPY GREET.")
//!     .unwrap();
//! assert_eq!(unit.tokens[0].kind.to_string(), "DISPLAY");
//! ```

pub mod classify;
pub mod copy;
pub mod diagnostic;
pub mod error;
pub mod exec;
pub mod options;
pub mod preprocessor;
pub mod pseudo_text;
pub mod replace;
pub mod source;
pub mod token;

pub use copy::{
    CopyOrigin, CopyRequest, CopybookLookup, DirectoryLookup, LookupError, MemoryLookup,
};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use error::{PreprocessError, Result};
pub use exec::ExecKind;
pub use options::{CompilerOptionSet, OptionValue};
pub use preprocessor::{PreprocessedUnit, Preprocessor};
pub use pseudo_text::ReplaceRule;
pub use replace::{ReplaceScope, ScopeStack};
pub use source::{condition_source, LogicalLine, SourceFormat};
pub use token::{Keyword, Punct, Token, TokenKind};

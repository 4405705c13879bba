//! COPY statements and copybook resolution.
//!
//! Parsing lives here together with the [`CopybookLookup`] collaborator
//! trait and its two shipped implementations: an in-memory map for tests
//! and embedders, and a directory walker for on-disk copybook libraries.
//! The recursive expansion itself is driven from the preprocessor.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use cobol_preproc_core::Span;
use thiserror::Error;

use crate::error::{PreprocessError, Result};
use crate::pseudo_text::ReplaceRule;
use crate::replace::{parse_rule_list, skip_newlines};
use crate::token::{Keyword, Punct, Token, TokenKind};

/// A parsed COPY statement.
#[derive(Debug, Clone)]
pub struct CopyRequest {
    /// Copybook name as written (word, filename, or quoted literal).
    pub name: String,
    /// `OF`/`IN` library qualifier.
    pub library: Option<String>,
    /// One-shot REPLACING rules, applied to this expansion only.
    pub replacing: Vec<ReplaceRule>,
    /// `SUPPRESS`: resolve the copybook but emit nothing.
    pub suppress: bool,
    /// Span of the whole statement.
    pub span: Span,
}

/// Identity of the copybook a token run came from; qualifier matching in
/// REPLACE rules keys off this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOrigin {
    pub name: String,
    pub library: Option<String>,
}

/// Parse one COPY statement. `pos` points at the `COPY` keyword on entry
/// and past the terminating period on success.
pub fn parse_copy_statement(tokens: &[Token], pos: &mut usize) -> Result<CopyRequest> {
    let start_span = tokens[*pos].span;
    *pos += 1;
    skip_newlines(tokens, pos);

    let Some(name_token) = tokens.get(*pos) else {
        return Err(PreprocessError::MalformedStatement {
            statement: "COPY",
            message: "expected a copybook name".into(),
            span: start_span,
        });
    };
    let name = match &name_token.kind {
        TokenKind::NonNumericLiteral(s) => s.clone(),
        other => match other.word_text() {
            Some(w) => w.to_string(),
            None => {
                return Err(PreprocessError::MalformedStatement {
                    statement: "COPY",
                    message: format!("expected a copybook name, found '{other}'"),
                    span: name_token.span,
                });
            }
        },
    };
    let mut span = start_span.extend(name_token.span);
    *pos += 1;

    let mut library = None;
    let mut suppress = false;
    let mut replacing = Vec::new();

    loop {
        skip_newlines(tokens, pos);
        match tokens.get(*pos).map(|t| &t.kind) {
            Some(TokenKind::Keyword(Keyword::Of)) | Some(TokenKind::Keyword(Keyword::In)) => {
                *pos += 1;
                skip_newlines(tokens, pos);
                match tokens.get(*pos).and_then(|t| t.kind.word_text()) {
                    Some(lib) => {
                        library = Some(lib.to_string());
                        span = span.extend(tokens[*pos].span);
                        *pos += 1;
                    }
                    None => {
                        return Err(PreprocessError::MalformedStatement {
                            statement: "COPY",
                            message: "expected a library name after OF/IN".into(),
                            span,
                        });
                    }
                }
            }
            Some(TokenKind::Keyword(Keyword::Suppress)) => {
                suppress = true;
                span = span.extend(tokens[*pos].span);
                *pos += 1;
            }
            Some(TokenKind::Keyword(Keyword::Replacing)) => {
                *pos += 1;
                replacing = parse_rule_list(tokens, pos, false, "COPY")?;
                if let Some(last) = tokens.get(pos.saturating_sub(1)) {
                    span = span.extend(last.span);
                }
                return Ok(CopyRequest { name, library, replacing, suppress, span });
            }
            Some(TokenKind::Punct(Punct::Period)) => {
                span = span.extend(tokens[*pos].span);
                *pos += 1;
                return Ok(CopyRequest { name, library, replacing, suppress, span });
            }
            _ => {
                return Err(PreprocessError::MalformedStatement {
                    statement: "COPY",
                    message: "expected OF/IN, SUPPRESS, REPLACING, or the terminating period"
                        .into(),
                    span: tokens.get(*pos).map(|t| t.span).unwrap_or(span),
                });
            }
        }
    }
}

/// Why a copybook could not be fetched.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// No copybook with that name (and library, when given).
    #[error("copybook not found")]
    NotFound,
    /// The embedder canceled the preprocessing run.
    #[error("lookup canceled")]
    Canceled,
    /// The copybook exists but could not be read.
    #[error("{0}")]
    Io(String),
}

/// Resolves copybook names to source text.
///
/// Name and library matching is case-insensitive. Implementations must be
/// `Send + Sync` so one lookup can back concurrently preprocessed units.
pub trait CopybookLookup: Send + Sync {
    fn fetch(&self, name: &str, library: Option<&str>) -> std::result::Result<String, LookupError>;
}

/// In-memory copybook map for tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup {
    books: HashMap<(String, Option<String>), String>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a copybook, optionally under a library.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        library: Option<&str>,
        text: impl Into<String>,
    ) -> &mut Self {
        self.books.insert(
            (
                name.into().to_ascii_uppercase(),
                library.map(str::to_ascii_uppercase),
            ),
            text.into(),
        );
        self
    }
}

impl CopybookLookup for MemoryLookup {
    fn fetch(&self, name: &str, library: Option<&str>) -> std::result::Result<String, LookupError> {
        let key = (
            name.to_ascii_uppercase(),
            library.map(str::to_ascii_uppercase),
        );
        self.books.get(&key).cloned().ok_or(LookupError::NotFound)
    }
}

/// On-disk copybook resolution over a list of search directories.
///
/// A library qualifier names a subdirectory of each search path. File
/// names are probed case-insensitively against the copybook name with
/// each configured extension; a name that already carries an extension is
/// also probed verbatim.
#[derive(Debug, Clone)]
pub struct DirectoryLookup {
    search_paths: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl DirectoryLookup {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            extensions: vec!["cpy".into(), "cbl".into(), "cob".into()],
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    fn candidates(&self, name: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if name.contains('.') {
            names.push(name.to_ascii_uppercase());
        }
        for ext in &self.extensions {
            names.push(format!("{}.{}", name.to_ascii_uppercase(), ext.to_ascii_uppercase()));
        }
        names.push(name.to_ascii_uppercase());
        names
    }

    fn probe(&self, dir: &Path, name: &str) -> std::result::Result<Option<PathBuf>, LookupError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            // A missing search directory is not an error.
            Err(_) => return Ok(None),
        };
        let wanted = self.candidates(name);
        for entry in entries {
            let entry = entry.map_err(|e| LookupError::Io(e.to_string()))?;
            let file_name = entry.file_name().to_string_lossy().to_ascii_uppercase();
            if wanted.iter().any(|w| *w == file_name) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }
}

impl CopybookLookup for DirectoryLookup {
    fn fetch(&self, name: &str, library: Option<&str>) -> std::result::Result<String, LookupError> {
        for base in &self.search_paths {
            let dir = match library {
                Some(lib) => base.join(lib.to_ascii_lowercase()),
                None => base.clone(),
            };
            if let Some(path) = self.probe(&dir, name)? {
                return fs::read_to_string(&path).map_err(|e| LookupError::Io(e.to_string()));
            }
        }
        Err(LookupError::NotFound)
    }
}

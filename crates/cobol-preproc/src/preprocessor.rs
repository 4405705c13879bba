//! The preprocessing driver.
//!
//! One pass over the classified token stream: plain text is flushed
//! through the active REPLACE scopes, directives are dispatched off a
//! closed [`DirectiveKind`], and COPY statements recurse with the scope
//! stack threaded through. Cycle detection keys on the requested
//! (name, library) pair; a depth limit backstops degenerate nesting.

use std::collections::HashSet;

use cobol_preproc_core::FileId;

use crate::classify::classify_lines;
use crate::copy::{parse_copy_statement, CopyOrigin, CopyRequest, CopybookLookup, LookupError};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::{PreprocessError, Result};
use crate::exec::ExecKind;
use crate::options::{parse_directive, CompilerOptionSet};
use crate::pseudo_text::{match_and_replace, ReplaceRule};
use crate::replace::{parse_replace_statement, ReplaceStatement, ScopeStack};
use crate::source::{condition_source, SourceFormat};
use crate::token::{Keyword, Punct, Token, TokenKind};

/// Default COPY nesting limit.
const DEFAULT_MAX_DEPTH: usize = 64;

/// The directives the dispatcher recognizes at the head of a token run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Copy,
    Replace,
    ReplaceOff,
    CompilerDirective,
    Exec(ExecKind),
    Listing,
}

/// The result of preprocessing one compilation unit.
#[derive(Debug, Clone)]
pub struct PreprocessedUnit {
    /// The resolved token stream, directives gone, copies expanded,
    /// substitutions applied.
    pub tokens: Vec<Token>,
    /// Merged compiler options from every CBL/PROCESS statement.
    pub options: CompilerOptionSet,
    /// Recoverable conditions encountered along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// Directive resolution engine for one compilation unit.
///
/// The engine is single-use: build it, configure it, call
/// [`preprocess`](Self::preprocess).
pub struct Preprocessor<'a> {
    lookup: &'a dyn CopybookLookup,
    format: SourceFormat,
    max_depth: usize,
    scopes: ScopeStack,
    in_progress: HashSet<(String, Option<String>)>,
    diagnostics: Vec<Diagnostic>,
    options: CompilerOptionSet,
    next_file: u32,
}

impl<'a> Preprocessor<'a> {
    pub fn new(lookup: &'a dyn CopybookLookup) -> Self {
        Self {
            lookup,
            format: SourceFormat::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            scopes: ScopeStack::new(),
            in_progress: HashSet::new(),
            diagnostics: Vec::new(),
            options: CompilerOptionSet::new(),
            next_file: FileId::MAIN.0 + 1,
        }
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve every directive in `source` and return the flat unit.
    pub fn preprocess(mut self, source: &str) -> Result<PreprocessedUnit> {
        let lines = condition_source(source, FileId::MAIN, self.format);
        let tokens = classify_lines(&lines);
        let mut out = Vec::new();
        self.run(&tokens, &[], None, 0, &mut out)?;
        self.scopes.drain_dangling(&mut self.diagnostics);
        Ok(PreprocessedUnit {
            tokens: out,
            options: self.options,
            diagnostics: self.diagnostics,
        })
    }

    /// Walk one token stream, dispatching directives and flushing the
    /// plain runs between them.
    ///
    /// Each flushed run passes through `replacing` — the one-shot rules
    /// of the COPY statement that produced this stream, empty for the
    /// main unit — and then through every active REPLACE region in push
    /// order, against the live stack. A run therefore sees each scope
    /// exactly once, outermost first, and a region opened or closed
    /// mid-stream affects exactly the text that follows it.
    fn run(
        &mut self,
        tokens: &[Token],
        replacing: &[ReplaceRule],
        origin: Option<&CopyOrigin>,
        depth: usize,
        out: &mut Vec<Token>,
    ) -> Result<()> {
        let mut i = 0;
        let mut run_start = 0;
        while i < tokens.len() {
            let Some(kind) = directive_at(tokens, i) else {
                i += 1;
                continue;
            };
            self.flush(&tokens[run_start..i], replacing, origin, out);

            match kind {
                DirectiveKind::Copy => {
                    let mut pos = i;
                    let request = parse_copy_statement(tokens, &mut pos)?;
                    i = pos;
                    self.resolve_copy(request, depth, out)?;
                }
                DirectiveKind::Replace | DirectiveKind::ReplaceOff => {
                    let mut pos = i;
                    match parse_replace_statement(tokens, &mut pos)? {
                        ReplaceStatement::Off(span) => {
                            if !self.scopes.pop() {
                                self.diagnostics.push(Diagnostic::warning(
                                    DiagnosticKind::UnmatchedReplaceOff,
                                    "REPLACE OFF without an open REPLACE region",
                                    span,
                                ));
                            }
                        }
                        ReplaceStatement::Push(scope) => self.scopes.push(scope),
                    }
                    i = pos;
                }
                DirectiveKind::CompilerDirective => {
                    let mut pos = i;
                    let mut options = std::mem::take(&mut self.options);
                    let parsed = parse_directive(tokens, &mut pos, &mut options);
                    self.options = options;
                    parsed?;
                    i = pos;
                }
                DirectiveKind::Exec(exec) => {
                    // Opaque block: the whole run, EXEC through END-EXEC,
                    // passes through untouched apart from substitution.
                    let end = scan_exec(tokens, i, exec)?;
                    self.flush(&tokens[i..end], replacing, origin, out);
                    i = end;
                }
                DirectiveKind::Listing => {
                    i = skip_listing(tokens, i);
                }
            }
            run_start = i;
        }
        self.flush(&tokens[run_start..], replacing, origin, out);
        Ok(())
    }

    fn flush(
        &mut self,
        run: &[Token],
        replacing: &[ReplaceRule],
        origin: Option<&CopyOrigin>,
        out: &mut Vec<Token>,
    ) {
        if run.is_empty() {
            return;
        }
        // One-shot REPLACING first, then the active regions.
        let transformed = match_and_replace(run, replacing, origin);
        let transformed = self
            .scopes
            .apply(transformed, origin, &mut self.diagnostics);
        out.extend(transformed);
    }

    /// Expand one COPY statement into `out`.
    fn resolve_copy(
        &mut self,
        request: CopyRequest,
        depth: usize,
        out: &mut Vec<Token>,
    ) -> Result<()> {
        if depth >= self.max_depth {
            return Err(PreprocessError::CopyDepthExceeded {
                max: self.max_depth,
                span: request.span,
            });
        }

        let key = (
            request.name.to_ascii_uppercase(),
            request.library.as_deref().map(str::to_ascii_uppercase),
        );
        if !self.in_progress.insert(key.clone()) {
            return Err(PreprocessError::CyclicCopy {
                name: request.name,
                library: request.library,
                span: request.span,
            });
        }

        let text = match self.lookup.fetch(&request.name, request.library.as_deref()) {
            Ok(text) => text,
            Err(err) => {
                self.in_progress.remove(&key);
                return Err(match err {
                    LookupError::NotFound => PreprocessError::CopybookNotFound {
                        name: request.name,
                        library: request.library,
                        span: request.span,
                    },
                    LookupError::Canceled => PreprocessError::Canceled,
                    LookupError::Io(message) => PreprocessError::Lookup(message),
                });
            }
        };

        tracing::debug!(name = %request.name, library = ?request.library, depth, "expanding copybook");

        let file = FileId(self.next_file);
        self.next_file += 1;
        let lines = condition_source(&text, file, self.format);
        let tokens = classify_lines(&lines);

        let origin = CopyOrigin {
            name: request.name.clone(),
            library: request.library.clone(),
        };
        let mut expansion = Vec::new();
        let resolved = self.run(
            &tokens,
            &request.replacing,
            Some(&origin),
            depth + 1,
            &mut expansion,
        );
        self.in_progress.remove(&key);
        resolved?;

        if request.suppress {
            self.diagnostics.push(Diagnostic::info(
                DiagnosticKind::SuppressedCopy,
                format!("COPY {} resolved but suppressed", request.name),
                request.span,
            ));
        } else {
            out.extend(expansion);
        }
        Ok(())
    }
}

/// Classify the token at `i` as the head of a directive, if it is one.
fn directive_at(tokens: &[Token], i: usize) -> Option<DirectiveKind> {
    let TokenKind::Keyword(kw) = &tokens[i].kind else {
        return None;
    };
    match kw {
        Keyword::Copy => Some(DirectiveKind::Copy),
        Keyword::Replace => {
            if matches!(
                peek_word(tokens, i + 1),
                Some(TokenKind::Keyword(Keyword::Off))
            ) {
                Some(DirectiveKind::ReplaceOff)
            } else {
                Some(DirectiveKind::Replace)
            }
        }
        Keyword::Cbl | Keyword::Process => Some(DirectiveKind::CompilerDirective),
        Keyword::Exec => {
            // EXEC SQL is not opaque: its interior is dispatched normally
            // so SQL INCLUDE-style copybooks resolve. Unknown targets are
            // plain text.
            match peek_word(tokens, i + 1).and_then(ExecKind::from_token) {
                Some(kind) if kind.is_opaque() => Some(DirectiveKind::Exec(kind)),
                _ => None,
            }
        }
        Keyword::Eject | Keyword::Skip1 | Keyword::Skip2 | Keyword::Skip3 | Keyword::Title => {
            Some(DirectiveKind::Listing)
        }
        _ => None,
    }
}

/// The first non-newline token kind at or after `j`.
fn peek_word(tokens: &[Token], mut j: usize) -> Option<&TokenKind> {
    while tokens.get(j).is_some_and(|t| t.kind.is_newline()) {
        j += 1;
    }
    tokens.get(j).map(|t| &t.kind)
}

/// Find the end of an opaque EXEC block: past `END-EXEC` and its
/// optional period.
fn scan_exec(tokens: &[Token], start: usize, kind: ExecKind) -> Result<usize> {
    let mut i = start;
    while i < tokens.len() {
        if matches!(tokens[i].kind, TokenKind::Keyword(Keyword::EndExec)) {
            i += 1;
            if matches!(
                tokens.get(i).map(|t| &t.kind),
                Some(TokenKind::Punct(Punct::Period))
            ) {
                i += 1;
            }
            return Ok(i);
        }
        i += 1;
    }
    Err(PreprocessError::UnterminatedExec {
        kind,
        span: tokens[start].span,
    })
}

/// Consume a listing statement: `EJECT`, `SKIP1/2/3`, or `TITLE` with its
/// optional literal, each with an optional period.
fn skip_listing(tokens: &[Token], start: usize) -> usize {
    let mut i = start;
    let is_title = matches!(tokens[i].kind, TokenKind::Keyword(Keyword::Title));
    i += 1;
    if is_title
        && matches!(
            tokens.get(i).map(|t| &t.kind),
            Some(TokenKind::NonNumericLiteral(_))
        )
    {
        i += 1;
    }
    if matches!(
        tokens.get(i).map(|t| &t.kind),
        Some(TokenKind::Punct(Punct::Period))
    ) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::MemoryLookup;

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| !t.kind.is_newline())
            .map(|t| t.kind.to_string())
            .collect()
    }

    fn run(lookup: &MemoryLookup, source: &str) -> Result<PreprocessedUnit> {
        Preprocessor::new(lookup)
            .with_format(SourceFormat::Free)
            .preprocess(source)
    }

    #[test]
    fn test_plain_text_passes_through() {
        let lookup = MemoryLookup::new();
        let unit = run(&lookup, "MOVE A TO B.").unwrap();
        assert_eq!(texts(&unit.tokens), ["MOVE", "A", "TO", "B", "."]);
        assert!(unit.diagnostics.is_empty());
    }

    #[test]
    fn test_listing_statements_consumed() {
        let lookup = MemoryLookup::new();
        let unit = run(&lookup, "EJECT.\nSKIP2\nTITLE 'PAYROLL'.\nMOVE A TO B.").unwrap();
        assert_eq!(texts(&unit.tokens), ["MOVE", "A", "TO", "B", "."]);
    }

    #[test]
    fn test_unknown_exec_target_is_plain_text() {
        let lookup = MemoryLookup::new();
        let unit = run(&lookup, "EXEC DLI TERM END-EXEC.").unwrap();
        assert_eq!(texts(&unit.tokens), ["EXEC", "DLI", "TERM", "END-EXEC", "."]);
    }

    #[test]
    fn test_depth_limit() {
        let mut lookup = MemoryLookup::new();
        lookup.insert("A", None, "COPY B.");
        lookup.insert("B", None, "COPY A2.");
        lookup.insert("A2", None, "DISPLAY 'DEEP'.");
        let err = Preprocessor::new(&lookup)
            .with_format(SourceFormat::Free)
            .with_max_depth(1)
            .preprocess("COPY A.")
            .unwrap_err();
        assert!(matches!(err, PreprocessError::CopyDepthExceeded { max: 1, .. }));
    }

    #[test]
    fn test_same_copybook_twice_sequentially_is_fine() {
        let mut lookup = MemoryLookup::new();
        lookup.insert("GREET", None, "DISPLAY 'HI'.");
        let unit = run(&lookup, "COPY GREET.\nCOPY GREET.").unwrap();
        assert_eq!(
            texts(&unit.tokens),
            ["DISPLAY", "'HI'", ".", "DISPLAY", "'HI'", "."]
        );
    }
}

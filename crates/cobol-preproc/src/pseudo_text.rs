//! Pseudo-text substitution rules and the token matcher.
//!
//! A rule rewrites one token sequence to another. Patterns and
//! replacements come from `==...==` pseudo-text or from single
//! word/literal operands; either way they are token sequences by the time
//! they reach the matcher. Matching is one left-to-right pass: at each
//! position the first listed rule whose pattern aligns wins, the cursor
//! jumps past the consumed input, and replacement output is never
//! re-scanned. Input newlines are transparent during alignment so a
//! pattern can straddle source lines.

use cobol_preproc_core::Span;

use crate::copy::CopyOrigin;
use crate::error::{PreprocessError, Result};
use crate::token::Token;

/// One substitution rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceRule {
    /// Tokens to match; never empty, never contains newlines.
    pub pattern: Vec<Token>,
    /// Tokens to emit; may be empty (deletion).
    pub replacement: Vec<Token>,
    /// `OF`/`IN` qualifier: only applies to copybooks from this library.
    pub library: Option<String>,
    /// `ON` qualifier: only applies to copybooks with this name.
    pub family: Option<String>,
    /// Where the rule was written.
    pub span: Span,
}

impl ReplaceRule {
    /// Build a rule, normalizing newlines out of both operands.
    ///
    /// An empty pattern can never align with anything and is rejected.
    pub fn new(pattern: Vec<Token>, replacement: Vec<Token>, span: Span) -> Result<Self> {
        let pattern: Vec<Token> = pattern
            .into_iter()
            .filter(|t| !t.kind.is_newline())
            .collect();
        let replacement: Vec<Token> = replacement
            .into_iter()
            .filter(|t| !t.kind.is_newline())
            .collect();
        if pattern.is_empty() {
            return Err(PreprocessError::MalformedPseudoText {
                message: "pattern pseudo-text is empty".into(),
                span,
            });
        }
        Ok(Self {
            pattern,
            replacement,
            library: None,
            family: None,
            span,
        })
    }

    /// Whether this rule is restricted to particular copybooks.
    pub fn is_qualified(&self) -> bool {
        self.library.is_some() || self.family.is_some()
    }

    /// Whether the rule applies to text coming from `origin`.
    ///
    /// Unqualified rules apply everywhere, including the main unit
    /// (`origin == None`). Qualified rules apply only inside a copybook
    /// whose library/name matches, case-insensitively.
    pub fn applies_to(&self, origin: Option<&CopyOrigin>) -> bool {
        if !self.is_qualified() {
            return true;
        }
        let Some(origin) = origin else {
            return false;
        };
        if let Some(lib) = &self.library {
            let matched = origin
                .library
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(lib));
            if !matched {
                return false;
            }
        }
        if let Some(name) = &self.family {
            if !origin.name.eq_ignore_ascii_case(name) {
                return false;
            }
        }
        true
    }
}

/// Apply `rules` to `tokens` in one pass.
///
/// Rules not applicable to `origin` are skipped entirely. The newlines a
/// multi-line match consumed are not reissued; replacement tokens keep
/// the spans of the rule that produced them.
pub fn match_and_replace(
    tokens: &[Token],
    rules: &[ReplaceRule],
    origin: Option<&CopyOrigin>,
) -> Vec<Token> {
    if rules.is_empty() {
        return tokens.to_vec();
    }

    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    'scan: while i < tokens.len() {
        if tokens[i].kind.is_newline() {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        for rule in rules.iter().filter(|r| r.applies_to(origin)) {
            if let Some(end) = match_at(tokens, i, &rule.pattern) {
                out.extend(rule.replacement.iter().cloned());
                i = end;
                continue 'scan;
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// Align `pattern` against `tokens` starting at `start`.
///
/// Returns the index just past the consumed input on success. Input
/// newlines are skipped; pattern tokens contain none.
fn match_at(tokens: &[Token], start: usize, pattern: &[Token]) -> Option<usize> {
    let mut i = start;
    for expected in pattern {
        while i < tokens.len() && tokens[i].kind.is_newline() {
            i += 1;
        }
        if i >= tokens.len() || !tokens[i].kind.matches(&expected.kind) {
            return None;
        }
        i += 1;
    }
    Some(i)
}

//! REPLACE regions and the scope stack.
//!
//! `REPLACE rule-list .` opens a region; `REPLACE OFF .` closes the most
//! recent one. Regions nest, and they scope dynamically: a region opened
//! before a COPY is still active inside the copied text, and a region
//! opened inside a copybook keeps applying after the copy returns until
//! its own `REPLACE OFF`.
//!
//! Scopes compose in push order: the outermost active region transforms
//! the text first, then each newer region transforms that result in turn.

use std::collections::HashSet;

use cobol_preproc_core::Span;

use crate::copy::CopyOrigin;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::{PreprocessError, Result};
use crate::pseudo_text::{match_and_replace, ReplaceRule};
use crate::token::{Keyword, Punct, Token, TokenKind};

/// One active REPLACE region.
#[derive(Debug, Clone)]
pub struct ReplaceScope {
    pub rules: Vec<ReplaceRule>,
    /// Span of the REPLACE statement that opened the region.
    pub span: Span,
}

/// The stack of active REPLACE regions.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<ReplaceScope>,
    /// (scope, origin) pairs already warned about for qualifier
    /// ambiguity, so one copybook expansion warns once however many
    /// token runs flush through it.
    warned: HashSet<(Span, String, Option<String>)>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push(&mut self, scope: ReplaceScope) {
        tracing::debug!(rules = scope.rules.len(), depth = self.scopes.len() + 1, "REPLACE region opened");
        self.scopes.push(scope);
    }

    /// Close the most recent region. Returns `false` when there is none.
    pub fn pop(&mut self) -> bool {
        let closed = self.scopes.pop().is_some();
        if closed {
            tracing::debug!(depth = self.scopes.len(), "REPLACE region closed");
        }
        closed
    }

    /// Transform `tokens` by every active region, in push order.
    pub fn apply(
        &mut self,
        mut tokens: Vec<Token>,
        origin: Option<&CopyOrigin>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Token> {
        if let Some(origin) = origin {
            for i in 0..self.scopes.len() {
                let Some(diag) = ambiguity_for(&self.scopes[i], origin) else {
                    continue;
                };
                let key = (
                    self.scopes[i].span,
                    origin.name.to_ascii_uppercase(),
                    origin.library.as_deref().map(str::to_ascii_uppercase),
                );
                if self.warned.insert(key) {
                    diagnostics.push(diag);
                }
            }
        }
        for scope in &self.scopes {
            tokens = match_and_replace(&tokens, &scope.rules, origin);
        }
        tokens
    }

    /// Close every region still open at end of unit, warning about each.
    pub fn drain_dangling(&mut self, diagnostics: &mut Vec<Diagnostic>) {
        for scope in self.scopes.drain(..).rev() {
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::DanglingReplaceScope,
                "REPLACE region still active at end of unit; implicitly closed",
                scope.span,
            ));
        }
    }
}

/// Warn when more than one qualified rule of a scope targets `origin`.
/// The matcher uses the first-declared rule, so this is not fatal.
fn ambiguity_for(scope: &ReplaceScope, origin: &CopyOrigin) -> Option<Diagnostic> {
    let mut qualified = scope
        .rules
        .iter()
        .filter(|r| r.is_qualified() && r.applies_to(Some(origin)));
    let first = qualified.next()?;
    let second = qualified.next()?;
    Some(Diagnostic::warning(
        DiagnosticKind::AmbiguousRuleQualifier,
        format!(
            "multiple qualified rules apply to copybook '{}'; the first-declared rule wins",
            origin.name
        ),
        second.span.extend(first.span),
    ))
}

/// A parsed REPLACE statement.
#[derive(Debug, Clone)]
pub enum ReplaceStatement {
    /// `REPLACE OFF .`
    Off(Span),
    /// `REPLACE rule-list .`
    Push(ReplaceScope),
}

/// Parse one REPLACE statement. `pos` points at the `REPLACE` keyword on
/// entry and past the terminating period on success.
pub fn parse_replace_statement(tokens: &[Token], pos: &mut usize) -> Result<ReplaceStatement> {
    let span = tokens[*pos].span;
    *pos += 1;
    skip_newlines(tokens, pos);

    if matches!(
        tokens.get(*pos).map(|t| &t.kind),
        Some(TokenKind::Keyword(Keyword::Off))
    ) {
        *pos += 1;
        expect_period(tokens, pos, "REPLACE")?;
        return Ok(ReplaceStatement::Off(span));
    }

    let rules = parse_rule_list(tokens, pos, true, "REPLACE")?;
    if rules.is_empty() {
        return Err(PreprocessError::MalformedStatement {
            statement: "REPLACE",
            message: "expected OFF or at least one replacement rule".into(),
            span,
        });
    }
    Ok(ReplaceStatement::Push(ReplaceScope { rules, span }))
}

/// Parse a `pattern BY replacement [OF|IN lib] [ON name]` rule list up to
/// and including the terminating period.
///
/// Shared between REPLACE statements and COPY REPLACING phrases; the
/// latter does not accept qualifiers.
pub fn parse_rule_list(
    tokens: &[Token],
    pos: &mut usize,
    allow_qualifiers: bool,
    statement: &'static str,
) -> Result<Vec<ReplaceRule>> {
    let mut rules = Vec::new();
    loop {
        skip_newlines(tokens, pos);
        match tokens.get(*pos).map(|t| &t.kind) {
            Some(TokenKind::Punct(Punct::Period)) => {
                *pos += 1;
                return Ok(rules);
            }
            Some(_) => rules.push(parse_rule(tokens, pos, allow_qualifiers, statement)?),
            None => {
                return Err(PreprocessError::MalformedStatement {
                    statement,
                    message: "statement is missing its terminating period".into(),
                    span: tokens.last().map(|t| t.span).unwrap_or(Span::main(0, 0)),
                });
            }
        }
    }
}

fn parse_rule(
    tokens: &[Token],
    pos: &mut usize,
    allow_qualifiers: bool,
    statement: &'static str,
) -> Result<ReplaceRule> {
    let (pattern, pattern_span) = parse_operand(tokens, pos, statement)?;

    skip_newlines(tokens, pos);
    if !matches!(
        tokens.get(*pos).map(|t| &t.kind),
        Some(TokenKind::Keyword(Keyword::By))
    ) {
        let span = tokens.get(*pos).map(|t| t.span).unwrap_or(pattern_span);
        return Err(PreprocessError::MalformedStatement {
            statement,
            message: "expected BY after the pattern operand".into(),
            span,
        });
    }
    *pos += 1;

    let (replacement, replacement_span) = parse_operand(tokens, pos, statement)?;
    let mut rule = ReplaceRule::new(pattern, replacement, pattern_span.extend(replacement_span))?;

    if allow_qualifiers {
        loop {
            skip_newlines(tokens, pos);
            match tokens.get(*pos).map(|t| &t.kind) {
                Some(TokenKind::Keyword(Keyword::Of)) | Some(TokenKind::Keyword(Keyword::In)) => {
                    *pos += 1;
                    rule.library = Some(parse_qualifier_name(tokens, pos, statement)?);
                }
                Some(TokenKind::Keyword(Keyword::On)) => {
                    *pos += 1;
                    rule.family = Some(parse_qualifier_name(tokens, pos, statement)?);
                }
                _ => break,
            }
        }
    }
    Ok(rule)
}

/// One operand: `== tokens ==` pseudo-text, or a single word/literal.
fn parse_operand(
    tokens: &[Token],
    pos: &mut usize,
    statement: &'static str,
) -> Result<(Vec<Token>, Span)> {
    skip_newlines(tokens, pos);
    let Some(token) = tokens.get(*pos) else {
        return Err(PreprocessError::MalformedStatement {
            statement,
            message: "expected a pseudo-text or word operand".into(),
            span: tokens.last().map(|t| t.span).unwrap_or(Span::main(0, 0)),
        });
    };

    match &token.kind {
        TokenKind::Punct(Punct::PseudoDelim) => {
            let open_span = token.span;
            *pos += 1;
            let mut content = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(t) if matches!(t.kind, TokenKind::Punct(Punct::PseudoDelim)) => {
                        let span = open_span.extend(t.span);
                        *pos += 1;
                        return Ok((content, span));
                    }
                    Some(t) => {
                        content.push(t.clone());
                        *pos += 1;
                    }
                    None => {
                        return Err(PreprocessError::MalformedPseudoText {
                            message: "pseudo-text is missing its closing '=='".into(),
                            span: open_span,
                        });
                    }
                }
            }
        }
        TokenKind::Keyword(_)
        | TokenKind::Word(_)
        | TokenKind::Filename(_)
        | TokenKind::NonNumericLiteral(_)
        | TokenKind::NumericLiteral(_) => {
            let operand = (vec![token.clone()], token.span);
            *pos += 1;
            Ok(operand)
        }
        other => Err(PreprocessError::MalformedStatement {
            statement,
            message: format!("expected a pseudo-text or word operand, found '{other}'"),
            span: token.span,
        }),
    }
}

fn parse_qualifier_name(
    tokens: &[Token],
    pos: &mut usize,
    statement: &'static str,
) -> Result<String> {
    skip_newlines(tokens, pos);
    let name = tokens.get(*pos).and_then(|t| match &t.kind {
        TokenKind::NonNumericLiteral(s) => Some(s.as_str()),
        other => other.word_text(),
    });
    match name {
        Some(name) => {
            let name = name.to_string();
            *pos += 1;
            Ok(name)
        }
        None => Err(PreprocessError::MalformedStatement {
            statement,
            message: "expected a name after the qualifier keyword".into(),
            span: tokens
                .get(*pos)
                .or(tokens.last())
                .map(|t| t.span)
                .unwrap_or(Span::main(0, 0)),
        }),
    }
}

fn expect_period(tokens: &[Token], pos: &mut usize, statement: &'static str) -> Result<()> {
    skip_newlines(tokens, pos);
    match tokens.get(*pos).map(|t| &t.kind) {
        Some(TokenKind::Punct(Punct::Period)) => {
            *pos += 1;
            Ok(())
        }
        _ => Err(PreprocessError::MalformedStatement {
            statement,
            message: "statement is missing its terminating period".into(),
            span: tokens
                .get(*pos)
                .or(tokens.last())
                .map(|t| t.span)
                .unwrap_or(Span::main(0, 0)),
        }),
    }
}

pub(crate) fn skip_newlines(tokens: &[Token], pos: &mut usize) {
    while tokens.get(*pos).is_some_and(|t| t.kind.is_newline()) {
        *pos += 1;
    }
}

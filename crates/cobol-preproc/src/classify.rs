//! Word/literal classification.
//!
//! Turns conditioned logical lines into the token stream the directive
//! engines consume. Classification is deterministic and stateless given
//! the fixed keyword vocabulary; each logical line contributes its tokens
//! followed by one `Newline` token, because several directive rules are
//! newline-tolerant while the statement terminator `.` is not.

use cobol_preproc_core::Span;

use crate::source::LogicalLine;
use crate::token::{Keyword, Punct, Token, TokenKind};

/// Classify a whole conditioned unit into one flat token stream.
pub fn classify_lines(lines: &[LogicalLine]) -> Vec<Token> {
    let mut tokens = Vec::new();
    for line in lines {
        classify_line(line, &mut tokens);
    }
    tokens
}

/// Classify one logical line, appending its tokens and a trailing
/// `Newline`.
pub fn classify_line(line: &LogicalLine, out: &mut Vec<Token>) {
    let content = line.content.as_str();
    let file = line.file;
    let base = line.offset;

    // Free-format comment that survived conditioning.
    let trimmed = content.trim_start();
    if trimmed.starts_with("*>") {
        let lead = (content.len() - trimmed.len()) as u32;
        out.push(Token::new(
            TokenKind::Comment(trimmed.to_string()),
            Span::new(file, base + lead, base + content.len() as u32),
        ));
        out.push(Token::new(
            TokenKind::Newline,
            Span::point(file, base + content.len() as u32),
        ));
        return;
    }

    let chars: Vec<(usize, char)> = content.char_indices().collect();
    let n = chars.len();
    let byte_at = |i: usize| {
        if i < n {
            chars[i].0
        } else {
            content.len()
        }
    };

    let mut i = 0;
    while i < n {
        let (start_b, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = if ch == '=' && i + 1 < n && chars[i + 1].1 == '=' {
            i += 2;
            TokenKind::Punct(Punct::PseudoDelim)
        } else if ch == '\'' || ch == '"' {
            i += 1;
            let mut text = String::new();
            while i < n {
                let c = chars[i].1;
                if c == ch {
                    // Doubled quote escapes itself.
                    if i + 1 < n && chars[i + 1].1 == ch {
                        text.push(ch);
                        i += 2;
                    } else {
                        i += 1;
                        break;
                    }
                } else {
                    text.push(c);
                    i += 1;
                }
            }
            TokenKind::NonNumericLiteral(text)
        } else if ch == ',' {
            i += 1;
            TokenKind::Punct(Punct::Comma)
        } else if ch == '(' {
            i += 1;
            TokenKind::Punct(Punct::LParen)
        } else if ch == ')' {
            i += 1;
            TokenKind::Punct(Punct::RParen)
        } else if ch == '.' {
            i += 1;
            TokenKind::Punct(Punct::Period)
        } else if is_word_start(ch) {
            let mut has_dot = false;
            loop {
                while i < n && is_word_char(chars[i].1) {
                    i += 1;
                }
                // A `.` glued between word characters belongs to the
                // token: a decimal point or a filename separator. A `.`
                // followed by anything else terminates the statement.
                if i < n
                    && chars[i].1 == '.'
                    && i + 1 < n
                    && chars[i + 1].1.is_ascii_alphanumeric()
                {
                    has_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            word_kind(&content[start_b..byte_at(i)], has_dot)
        } else {
            // Free text: anything else, up to the next delimiter.
            i += 1;
            while i < n && !is_text_stop(chars[i].1) {
                i += 1;
            }
            TokenKind::Text(content[start_b..byte_at(i)].to_string())
        };

        let end_b = byte_at(i);
        out.push(Token::new(
            kind,
            Span::new(file, base + start_b as u32, base + end_b as u32),
        ));
    }

    out.push(Token::new(
        TokenKind::Newline,
        Span::point(file, base + content.len() as u32),
    ));
}

/// Word characters: alphanumerics plus `-`, `_`, and `:` (the latter so
/// conventional `:TAG:`-style substitution markers stay single words).
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == ':'
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == ':'
}

/// Characters that end a free-text run.
fn is_text_stop(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(ch, '\'' | '"' | ',' | '(' | ')' | '.' | '=')
        || is_word_start(ch)
}

fn word_kind(lexeme: &str, has_dot: bool) -> TokenKind {
    let numeric = lexeme.chars().next().is_some_and(|c| c.is_ascii_digit())
        && lexeme.chars().all(|c| c.is_ascii_digit() || c == '.')
        && lexeme.chars().filter(|&c| c == '.').count() <= 1;
    if numeric {
        return TokenKind::NumericLiteral(lexeme.to_string());
    }
    if has_dot {
        return TokenKind::Filename(lexeme.to_string());
    }
    match Keyword::lookup(lexeme) {
        Some(k) => TokenKind::Keyword(k),
        None => TokenKind::Word(lexeme.to_string()),
    }
}

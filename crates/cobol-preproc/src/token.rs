//! Token model for the preprocessing front end.
//!
//! The engine works on token streams, not characters: pseudo-text
//! substitution must respect word boundaries and compare words
//! case-insensitively. Only the compiler-directing vocabulary is reserved
//! here — everything else COBOL calls a word stays a [`TokenKind::Word`]
//! and is classified further by the downstream grammar.
//!
//! COBOL keywords are context-sensitive, not globally reserved, so
//! matching treats `Keyword`, `Word`, and `Filename` as one
//! interchangeable word class wherever pseudo-text or copy names are
//! expected (see [`TokenKind::matches`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use cobol_preproc_core::Span;

/// Reserved compiler-directing keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Copy,
    Replacing,
    Replace,
    Off,
    By,
    Of,
    In,
    On,
    Suppress,
    Cbl,
    Process,
    Exec,
    EndExec,
    Cics,
    Sql,
    Sqlims,
    Eject,
    Skip1,
    Skip2,
    Skip3,
    Title,
}

/// Map of uppercase keyword spellings to [`Keyword`] values.
static KEYWORDS: LazyLock<HashMap<&'static str, Keyword>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert("COPY", Keyword::Copy);
    map.insert("REPLACING", Keyword::Replacing);
    map.insert("REPLACE", Keyword::Replace);
    map.insert("OFF", Keyword::Off);
    map.insert("BY", Keyword::By);
    map.insert("OF", Keyword::Of);
    map.insert("IN", Keyword::In);
    map.insert("ON", Keyword::On);
    map.insert("SUPPRESS", Keyword::Suppress);
    map.insert("CBL", Keyword::Cbl);
    map.insert("PROCESS", Keyword::Process);
    map.insert("EXEC", Keyword::Exec);
    map.insert("END-EXEC", Keyword::EndExec);
    map.insert("CICS", Keyword::Cics);
    map.insert("SQL", Keyword::Sql);
    map.insert("SQLIMS", Keyword::Sqlims);
    map.insert("EJECT", Keyword::Eject);
    map.insert("SKIP1", Keyword::Skip1);
    map.insert("SKIP2", Keyword::Skip2);
    map.insert("SKIP3", Keyword::Skip3);
    map.insert("TITLE", Keyword::Title);
    map
});

impl Keyword {
    /// Look up a word against the directive vocabulary, case-insensitively.
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS.get(word.to_ascii_uppercase().as_str()).copied()
    }

    /// Canonical uppercase spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Copy => "COPY",
            Keyword::Replacing => "REPLACING",
            Keyword::Replace => "REPLACE",
            Keyword::Off => "OFF",
            Keyword::By => "BY",
            Keyword::Of => "OF",
            Keyword::In => "IN",
            Keyword::On => "ON",
            Keyword::Suppress => "SUPPRESS",
            Keyword::Cbl => "CBL",
            Keyword::Process => "PROCESS",
            Keyword::Exec => "EXEC",
            Keyword::EndExec => "END-EXEC",
            Keyword::Cics => "CICS",
            Keyword::Sql => "SQL",
            Keyword::Sqlims => "SQLIMS",
            Keyword::Eject => "EJECT",
            Keyword::Skip1 => "SKIP1",
            Keyword::Skip2 => "SKIP2",
            Keyword::Skip3 => "SKIP3",
            Keyword::Title => "TITLE",
        }
    }
}

/// Punctuation tokens the preprocessor grammar cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    /// `.` — statement terminator.
    Period,
    /// `,` — option and value separator.
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `==` — pseudo-text delimiter.
    PseudoDelim,
}

impl Punct {
    /// Source spelling of the punctuation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Punct::Period => ".",
            Punct::Comma => ",",
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::PseudoDelim => "==",
        }
    }
}

/// Kind and payload of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Reserved compiler-directing keyword.
    Keyword(Keyword),
    /// Identifier-like COBOL word (original case preserved).
    Word(String),
    /// Non-numeric literal; payload is the content between the quotes.
    NonNumericLiteral(String),
    /// Numeric literal, kept as written.
    NumericLiteral(String),
    /// A word containing an embedded `.`, e.g. `MEMBER.CPY`.
    Filename(String),
    /// Punctuation.
    Punct(Punct),
    /// A comment line that survives conditioning (free-format `*>`).
    Comment(String),
    /// Free text the classifier could not place in any other class.
    Text(String),
    /// End of a logical source line.
    Newline,
}

impl TokenKind {
    /// The word-class text of this token, if it has one.
    ///
    /// `Keyword`, `Word`, and `Filename` form one capability class: a
    /// keyword is accepted anywhere a generic word is grammatically valid.
    pub fn word_text(&self) -> Option<&str> {
        match self {
            TokenKind::Keyword(k) => Some(k.as_str()),
            TokenKind::Word(w) | TokenKind::Filename(w) => Some(w),
            _ => None,
        }
    }

    /// Equality used for pseudo-text pattern alignment.
    ///
    /// Word-class tokens compare case-insensitively on their text;
    /// literals compare exactly on content; punctuation compares on kind.
    /// `Newline` tokens never equal anything else — the matcher skips
    /// them during alignment instead.
    pub fn matches(&self, other: &TokenKind) -> bool {
        if let (Some(a), Some(b)) = (self.word_text(), other.word_text()) {
            return a.eq_ignore_ascii_case(b);
        }
        match (self, other) {
            (TokenKind::NonNumericLiteral(a), TokenKind::NonNumericLiteral(b)) => a == b,
            (TokenKind::NumericLiteral(a), TokenKind::NumericLiteral(b)) => a == b,
            (TokenKind::Punct(a), TokenKind::Punct(b)) => a == b,
            (TokenKind::Text(a), TokenKind::Text(b)) => a.eq_ignore_ascii_case(b),
            (TokenKind::Comment(a), TokenKind::Comment(b)) => a == b,
            (TokenKind::Newline, TokenKind::Newline) => true,
            _ => false,
        }
    }

    /// Returns `true` for the tokens the matcher skips during alignment.
    pub fn is_newline(&self) -> bool {
        matches!(self, TokenKind::Newline)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "{}", k.as_str()),
            TokenKind::Word(w) | TokenKind::Filename(w) => write!(f, "{w}"),
            TokenKind::NonNumericLiteral(s) => write!(f, "'{s}'"),
            TokenKind::NumericLiteral(n) => write!(f, "{n}"),
            TokenKind::Punct(p) => write!(f, "{}", p.as_str()),
            TokenKind::Comment(c) => write!(f, "{c}"),
            TokenKind::Text(t) => write!(f, "{t}"),
            TokenKind::Newline => writeln!(f),
        }
    }
}

/// One token with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

//! EXEC block handling.
//!
//! `EXEC CICS` and `EXEC SQLIMS` interiors are opaque to the
//! preprocessor: their tokens pass through untouched (apart from active
//! REPLACE scopes) until `END-EXEC`. `EXEC SQL` is deliberately *not*
//! opaque — SQL includes commonly pull in copybooks, so its interior
//! flows through the normal directive dispatch.

use std::fmt;

use crate::token::{Keyword, TokenKind};

/// Target languages recognized after `EXEC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecKind {
    Cics,
    Sql,
    Sqlims,
}

impl ExecKind {
    /// Classify the word following `EXEC`, if it names a known target.
    pub fn from_token(kind: &TokenKind) -> Option<ExecKind> {
        match kind {
            TokenKind::Keyword(Keyword::Cics) => Some(ExecKind::Cics),
            TokenKind::Keyword(Keyword::Sql) => Some(ExecKind::Sql),
            TokenKind::Keyword(Keyword::Sqlims) => Some(ExecKind::Sqlims),
            _ => None,
        }
    }

    /// Whether the block interior is passed through without directive
    /// dispatch.
    pub fn is_opaque(&self) -> bool {
        !matches!(self, ExecKind::Sql)
    }
}

impl fmt::Display for ExecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecKind::Cics => "CICS",
            ExecKind::Sql => "SQL",
            ExecKind::Sqlims => "SQLIMS",
        };
        write!(f, "{name}")
    }
}

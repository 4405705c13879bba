//! CBL/PROCESS statement parsing and compiler options.
//!
//! CBL and PROCESS statements carry comma- or space-separated compiler
//! options of the form `KEY`, `NOKEY`, or `KEY(v[,v...])`. The vocabulary
//! is a closed, table-driven set modeled on IBM Enterprise COBOL: each
//! option has a canonical spelling plus abbreviations, any known key can
//! be negated with a `NO` prefix, and `XOPTS(...)` nests a second option
//! list (the CICS translator options).
//!
//! A unit may carry several CBL/PROCESS statements; they all merge into
//! one [`CompilerOptionSet`], later statements winning.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};
use crate::token::{Punct, Token, TokenKind};

/// Option vocabulary: canonical spelling plus accepted abbreviations.
///
/// Covers the Enterprise COBOL compiler options and the CICS translator
/// sub-options accepted inside `XOPTS(...)`. `NO`-prefixed negations are
/// derived generically and are not listed.
const OPTION_TABLE: &[(&str, &[&str])] = &[
    ("ADATA", &[]),
    ("ADV", &[]),
    ("AFP", &[]),
    ("APOST", &[]),
    ("ARCH", &[]),
    ("ARITH", &["AR"]),
    ("AWO", &[]),
    ("BLOCK0", &[]),
    ("BUFSIZE", &["BUF"]),
    ("CBLCARD", &[]),
    ("CICS", &[]),
    ("CODEPAGE", &["CP"]),
    ("COBOL2", &[]),
    ("COBOL3", &[]),
    ("COMPILE", &["C"]),
    ("COPYLOC", &["CPLC"]),
    ("COPYRIGHT", &["CPYR"]),
    ("CPSM", &[]),
    ("CURRENCY", &["CURR"]),
    ("DATA", &[]),
    ("DBCS", &[]),
    ("DEBUG", &[]),
    ("DECK", &["D"]),
    ("DEFINE", &["DEF"]),
    ("DIAGTRUNC", &["DTR"]),
    ("DISPSIGN", &["DS"]),
    ("DLI", &[]),
    ("DLL", &[]),
    ("DUMP", &["DU"]),
    ("DYNAM", &["DYN"]),
    ("EDF", &[]),
    ("EXCI", &[]),
    ("EXIT", &["EX"]),
    ("EXPORTALL", &["EXP"]),
    ("FASTSRT", &["FSRT"]),
    ("FEPI", &[]),
    ("FLAG", &["F"]),
    ("FLAGSTD", &[]),
    ("GRAPHIC", &[]),
    ("HGPR", &[]),
    ("INITCHECK", &["IC"]),
    ("INITIAL", &[]),
    ("INLINE", &["INL"]),
    ("INTDATE", &[]),
    ("INVDATA", &[]),
    ("LANGUAGE", &["LANG"]),
    ("LENGTH", &[]),
    ("LINECOUNT", &["LC"]),
    ("LINKAGE", &[]),
    ("LIST", &[]),
    ("LP", &[]),
    ("MAP", &[]),
    ("MARGINS", &[]),
    ("MAXPCF", &[]),
    ("MDECK", &["MD"]),
    ("NAME", &[]),
    ("NATLANG", &[]),
    ("NSYMBOL", &["NS"]),
    ("NUMCHECK", &["NC"]),
    ("NUMPROC", &[]),
    ("OBJECT", &["OBJ"]),
    ("OFFSET", &["OFF"]),
    ("OPTFILE", &[]),
    ("OPTIMIZE", &["OPT"]),
    ("OPTIONS", &[]),
    ("OUTDD", &["OUT"]),
    ("PARMCHECK", &["PC"]),
    ("PGMNAME", &["PGMN"]),
    ("QUALIFY", &["QUA"]),
    ("QUOTE", &["Q"]),
    ("RENT", &[]),
    ("RMODE", &[]),
    ("RULES", &[]),
    ("SEQUENCE", &["SEQ"]),
    ("SERVICE", &["SERV"]),
    ("SOURCE", &["S"]),
    ("SP", &[]),
    ("SPACE", &[]),
    ("SPIE", &[]),
    ("SQL", &[]),
    ("SQLCCSID", &["SQLC"]),
    ("SQLIMS", &[]),
    ("SRCFORMAT", &[]),
    ("SSRANGE", &["SSR"]),
    ("STGOPT", &["SO"]),
    ("SUPPRESS", &[]),
    ("SYSEIB", &[]),
    ("TERMINAL", &["TERM"]),
    ("TEST", &[]),
    ("THREAD", &[]),
    ("TRUNC", &[]),
    ("TUNE", &[]),
    ("VBREF", &[]),
    ("VLR", &[]),
    ("VSAMOPENFS", &[]),
    ("WORD", &["WD"]),
    ("XMLPARSE", &["XP"]),
    ("XOPTS", &[]),
    ("XREF", &["X"]),
    ("ZONECHECK", &["ZC"]),
    ("ZONEDATA", &["ZD"]),
    ("ZWB", &[]),
];

/// Spelling (canonical or abbreviation) to canonical key.
static ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (canonical, aliases) in OPTION_TABLE {
        map.insert(*canonical, *canonical);
        for alias in *aliases {
            map.insert(*alias, *canonical);
        }
    }
    map
});

/// Resolve a spelled option key to its canonical form.
///
/// `NO`-prefixed spellings of any known key resolve to `NO` plus the
/// canonical key, so `NOX` and `NOXREF` both yield `NOXREF`.
pub fn resolve_key(word: &str) -> Option<String> {
    let upper = word.to_ascii_uppercase();
    if let Some(canonical) = ALIASES.get(upper.as_str()) {
        return Some((*canonical).to_string());
    }
    if let Some(rest) = upper.strip_prefix("NO") {
        if let Some(canonical) = ALIASES.get(rest) {
            return Some(format!("NO{canonical}"));
        }
    }
    None
}

/// Value carried by one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionValue {
    /// Bare key, e.g. `RENT` or `NOXREF`.
    Flag,
    /// Single parenthesized value, e.g. `ARITH(EXTEND)`.
    Value(String),
    /// Multiple parenthesized values, e.g. `MARGINS(1,72)`.
    List(Vec<String>),
}

/// The merged option set of a compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptionSet {
    options: BTreeMap<String, OptionValue>,
}

impl CompilerOptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an option under its canonical key, clearing its negation.
    pub fn set(&mut self, key: &str, value: OptionValue) {
        match key.strip_prefix("NO") {
            Some(rest) if ALIASES.contains_key(rest) => {
                self.options.remove(rest);
            }
            _ => {
                self.options.remove(&format!("NO{key}"));
            }
        }
        self.options.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Iterate options in canonical-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Parse one CBL/PROCESS statement into `set`.
///
/// `pos` points at the `CBL` or `PROCESS` keyword on entry and past the
/// statement's terminating newline on success. An option key outside the
/// vocabulary is fatal.
pub fn parse_directive(
    tokens: &[Token],
    pos: &mut usize,
    set: &mut CompilerOptionSet,
) -> Result<()> {
    debug_assert!(matches!(
        tokens.get(*pos).map(|t| &t.kind),
        Some(TokenKind::Keyword(_))
    ));
    *pos += 1;

    loop {
        match tokens.get(*pos).map(|t| &t.kind) {
            None | Some(TokenKind::Newline) => break,
            Some(TokenKind::Punct(Punct::Comma)) | Some(TokenKind::Punct(Punct::Period)) => {
                *pos += 1;
            }
            _ => parse_option(tokens, pos, set)?,
        }
    }
    if tokens.get(*pos).is_some() {
        *pos += 1; // the newline
    }
    Ok(())
}

/// Parse one `KEY`, `NOKEY`, or `KEY(values)` option.
fn parse_option(tokens: &[Token], pos: &mut usize, set: &mut CompilerOptionSet) -> Result<()> {
    let token = &tokens[*pos];
    let Some(word) = token.kind.word_text() else {
        return Err(PreprocessError::MalformedStatement {
            statement: "CBL",
            message: format!("expected an option name, found '{}'", token.kind),
            span: token.span,
        });
    };
    let Some(key) = resolve_key(word) else {
        return Err(PreprocessError::UnknownDirective {
            option: word.to_string(),
            span: token.span,
        });
    };
    *pos += 1;

    if !matches!(
        tokens.get(*pos).map(|t| &t.kind),
        Some(TokenKind::Punct(Punct::LParen))
    ) {
        set.set(&key, OptionValue::Flag);
        return Ok(());
    }
    *pos += 1; // past `(`

    if key == "XOPTS" {
        // The CICS translator option group: its values are options.
        set.set(&key, OptionValue::Flag);
        loop {
            match tokens.get(*pos).map(|t| &t.kind) {
                Some(TokenKind::Punct(Punct::RParen)) => {
                    *pos += 1;
                    return Ok(());
                }
                Some(TokenKind::Punct(Punct::Comma)) => *pos += 1,
                Some(_) if !tokens[*pos].kind.is_newline() => {
                    parse_option(tokens, pos, set)?;
                }
                _ => {
                    return Err(PreprocessError::MalformedStatement {
                        statement: "CBL",
                        message: "XOPTS group is missing its closing parenthesis".into(),
                        span: token.span,
                    });
                }
            }
        }
    }

    let mut values = Vec::new();
    loop {
        match tokens.get(*pos).map(|t| &t.kind) {
            Some(TokenKind::Punct(Punct::RParen)) => {
                *pos += 1;
                break;
            }
            Some(TokenKind::Punct(Punct::Comma)) => *pos += 1,
            Some(kind) if !kind.is_newline() => {
                values.push(value_text(kind));
                *pos += 1;
            }
            _ => {
                return Err(PreprocessError::MalformedStatement {
                    statement: "CBL",
                    message: format!("option '{key}' is missing its closing parenthesis"),
                    span: token.span,
                });
            }
        }
    }

    let value = match values.len() {
        0 => OptionValue::Flag,
        1 => OptionValue::Value(values.remove(0)),
        _ => OptionValue::List(values),
    };
    set.set(&key, value);
    Ok(())
}

/// Textual form of one option value token.
fn value_text(kind: &TokenKind) -> String {
    match kind {
        TokenKind::NonNumericLiteral(s) => s.clone(),
        TokenKind::NumericLiteral(n) => n.clone(),
        other => other
            .word_text()
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_lines;
    use crate::source::{condition_source, SourceFormat};
    use cobol_preproc_core::FileId;

    fn parse(text: &str) -> Result<CompilerOptionSet> {
        let lines = condition_source(text, FileId::MAIN, SourceFormat::Free);
        let tokens = classify_lines(&lines);
        let mut set = CompilerOptionSet::new();
        let mut pos = 0;
        parse_directive(&tokens, &mut pos, &mut set)?;
        Ok(set)
    }

    #[test]
    fn test_flag_and_value_options() {
        let set = parse("CBL RENT,ARITH(EXTEND)").unwrap();
        assert_eq!(set.get("RENT"), Some(&OptionValue::Flag));
        assert_eq!(set.get("ARITH"), Some(&OptionValue::Value("EXTEND".into())));
    }

    #[test]
    fn test_abbreviations_resolve_to_canonical() {
        let set = parse("PROCESS AR(E),CP(1140),X").unwrap();
        assert_eq!(set.get("ARITH"), Some(&OptionValue::Value("E".into())));
        assert_eq!(set.get("CODEPAGE"), Some(&OptionValue::Value("1140".into())));
        assert_eq!(set.get("XREF"), Some(&OptionValue::Flag));
    }

    #[test]
    fn test_list_values() {
        let set = parse("CBL MARGINS(1,72)").unwrap();
        assert_eq!(
            set.get("MARGINS"),
            Some(&OptionValue::List(vec!["1".into(), "72".into()]))
        );
    }

    #[test]
    fn test_no_prefix_negation() {
        let set = parse("CBL NOXREF,NOADV").unwrap();
        assert!(set.is_set("NOXREF"));
        assert!(set.is_set("NOADV"));
    }

    #[test]
    fn test_setting_clears_negation() {
        let mut set = parse("CBL NOXREF").unwrap();
        let lines = condition_source("CBL XREF", FileId::MAIN, SourceFormat::Free);
        let tokens = classify_lines(&lines);
        let mut pos = 0;
        parse_directive(&tokens, &mut pos, &mut set).unwrap();
        assert!(set.is_set("XREF"));
        assert!(!set.is_set("NOXREF"));
    }

    #[test]
    fn test_xopts_group_recurses() {
        let set = parse("CBL XOPTS(COBOL2 NOEDF NATLANG(E))").unwrap();
        assert!(set.is_set("XOPTS"));
        assert_eq!(set.get("COBOL2"), Some(&OptionValue::Flag));
        assert!(set.is_set("NOEDF"));
        assert_eq!(set.get("NATLANG"), Some(&OptionValue::Value("E".into())));
    }

    #[test]
    fn test_unknown_option_is_fatal() {
        let err = parse("CBL FOOBAR(XYZ)").unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::UnknownDirective { ref option, .. } if option == "FOOBAR"
        ));
    }

    #[test]
    fn test_missing_paren_is_malformed() {
        let err = parse("CBL ARITH(EXTEND").unwrap_err();
        assert!(matches!(err, PreprocessError::MalformedStatement { .. }));
    }

    #[test]
    fn test_case_insensitive_keys() {
        let set = parse("cbl arith(extend),trunc(bin)").unwrap();
        assert_eq!(set.get("ARITH"), Some(&OptionValue::Value("EXTEND".into())));
        assert_eq!(set.get("TRUNC"), Some(&OptionValue::Value("BIN".into())));
    }

    #[test]
    fn test_later_statement_wins() {
        let mut set = parse("CBL TRUNC(STD)").unwrap();
        let lines = condition_source("PROCESS TRUNC(BIN)", FileId::MAIN, SourceFormat::Free);
        let tokens = classify_lines(&lines);
        let mut pos = 0;
        parse_directive(&tokens, &mut pos, &mut set).unwrap();
        assert_eq!(set.get("TRUNC"), Some(&OptionValue::Value("BIN".into())));
    }

    #[test]
    fn test_serializes() {
        let set = parse("CBL ARITH(EXTEND),RENT").unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("ARITH"));
    }
}

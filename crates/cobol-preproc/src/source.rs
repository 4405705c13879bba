//! Logical-line conditioning.
//!
//! The engine proper consumes logical source lines: sequence and indicator
//! areas stripped, comment and debug lines removed, continuation lines
//! joined. Callers with an upstream conditioner can build
//! [`LogicalLine`]s themselves; [`condition_source`] is the shipped front
//! door for raw fixed- or free-format text.

use cobol_preproc_core::{normalize_line_endings, FileId, LineIndex};

/// COBOL source reference format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// Fixed format: columns 1-6 sequence, 7 indicator, 8-72 code.
    #[default]
    Fixed,
    /// Free format: no column restrictions, `*>` comment lines.
    Free,
}

/// Column indicator values in fixed format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Indicator {
    Normal,
    Comment,
    Continuation,
    Debug,
}

impl Indicator {
    fn from_char(ch: char) -> Self {
        match ch {
            '*' | '/' => Indicator::Comment,
            '-' => Indicator::Continuation,
            'D' | 'd' => Indicator::Debug,
            _ => Indicator::Normal,
        }
    }
}

/// One logical line of conditioned source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// The code content, free of sequence/indicator columns.
    pub content: String,
    /// File the line came from.
    pub file: FileId,
    /// Byte offset of the start of the content in the normalized text.
    pub offset: u32,
    /// Original line number (1-indexed).
    pub line: u32,
}

/// Condition raw source text into logical lines.
///
/// Line endings are normalized first; offsets refer to the normalized
/// text. Comment and debug lines are dropped. In fixed format,
/// continuation lines are joined onto the previous logical line: a
/// continuation whose first nonblank character is the quote of an open
/// literal resumes that literal directly, anything else joins with a
/// single space.
pub fn condition_source(text: &str, file: FileId, format: SourceFormat) -> Vec<LogicalLine> {
    let text = normalize_line_endings(text);
    let index = LineIndex::new(&text);
    let mut out: Vec<LogicalLine> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_start = index.line_start(i).unwrap_or(0);
        let line_no = i as u32 + 1;

        match format {
            SourceFormat::Free => {
                if raw.trim_start().starts_with("*>") {
                    continue;
                }
                out.push(LogicalLine {
                    content: raw.to_string(),
                    file,
                    offset: line_start,
                    line: line_no,
                });
            }
            SourceFormat::Fixed => {
                let indicator = raw
                    .chars()
                    .nth(6)
                    .map(Indicator::from_char)
                    .unwrap_or(Indicator::Normal);

                match indicator {
                    Indicator::Comment | Indicator::Debug => continue,
                    Indicator::Continuation => {
                        let cont = columns(raw, 7, 72);
                        join_continuation(&mut out, cont);
                    }
                    Indicator::Normal => {
                        let content = columns(raw, 7, 72).to_string();
                        // Byte offset of column 8; the sequence area may
                        // hold multi-byte characters.
                        let content_start = raw
                            .char_indices()
                            .nth(7)
                            .map(|(b, _)| b)
                            .unwrap_or(raw.len());
                        out.push(LogicalLine {
                            content,
                            file,
                            offset: line_start + content_start as u32,
                            line: line_no,
                        });
                    }
                }
            }
        }
    }

    out
}

/// Char-safe column slice: columns `[from, to)` of a line, 0-indexed.
fn columns(line: &str, from: usize, to: usize) -> &str {
    let mut indices = line.char_indices().skip(from);
    let Some((start, _)) = indices.next() else {
        return "";
    };
    let end = line
        .char_indices()
        .nth(to)
        .map(|(b, _)| b)
        .unwrap_or(line.len());
    &line[start..end]
}

/// Join a continuation line onto the previous logical line.
fn join_continuation(out: &mut Vec<LogicalLine>, cont: &str) {
    let cont = cont.trim_start();
    let Some(prev) = out.last_mut() else {
        // A continuation with nothing to continue.
        return;
    };

    let resumes_literal = cont
        .chars()
        .next()
        .map(|q| (q == '\'' || q == '"') && has_open_literal(&prev.content, q))
        .unwrap_or(false);

    if resumes_literal {
        // Drop the duplicated opening quote and splice directly.
        prev.content.push_str(&cont[1..]);
    } else {
        if !prev.content.ends_with(' ') && !cont.is_empty() {
            prev.content.push(' ');
        }
        prev.content.push_str(cont);
    }
}

/// Whether `content` ends inside an unclosed literal quoted by `quote`.
fn has_open_literal(content: &str, quote: char) -> bool {
    content.chars().filter(|&c| c == quote).count() % 2 == 1
}

//! Feature-template patterns.
//!
//! A pattern is a template string with embedded commands of the form
//! `%x[row,col]`, `%t[row,col,"regexp"]` or `%m[row,col,"regexp"]`. Applied at
//! a position of a tokenized sequence, each command resolves a referenced
//! token and contributes text to the observation string:
//!
//! - `x` emits the token itself
//! - `t` runs the regexp and emits `true` or `false`
//! - `m` runs the regexp and emits the first matched substring
//!
//! The row is an offset relative to the current position, or an absolute index
//! when written `[@row,...]` (negative absolute rows count from the end of the
//! sequence). References outside the sequence resolve to the sentinel tokens
//! `_x-1` … `_x-4` / `_x+1` … `_x+4`, capped at `_x-#` / `_x+#`. An uppercase
//! command letter lowercases whatever the command emitted.

use crate::reader::TokSeq;
use crate::rex;
use crate::TagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmdKind {
    Token,
    Test,
    Match,
}

#[derive(Debug, Clone)]
pub(crate) enum PatItem {
    /// Literal text between commands, copied verbatim.
    Literal(String),
    Command {
        kind: CmdKind,
        /// Lowercase the command output (`%X` instead of `%x`).
        caps: bool,
        absolute: bool,
        offset: i32,
        column: u32,
        /// Regexp source for `t` and `m` commands.
        regex: Option<String>,
    },
}

/// A compiled feature template. Owns its source string; the first character of
/// the source decides whether generated observations are unigram (`u`), bigram
/// (`b`) or both (`*`).
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    src: String,
    items: Vec<PatItem>,
}

const BVAL: [&str; 5] = ["_x-1", "_x-2", "_x-3", "_x-4", "_x-#"];
const EVAL: [&str; 5] = ["_x+1", "_x+2", "_x+3", "_x+4", "_x+#"];

impl Pattern {
    pub(crate) fn compile(src: String) -> Result<Self, TagError> {
        let bytes = src.as_bytes();
        let mut items = Vec::new();
        let mut pos = 0;
        let invalid = |reason: &str| TagError::PatternInvalid {
            pattern: src.clone(),
            reason: reason.to_string(),
        };
        while pos < bytes.len() {
            if bytes[pos] != b'%' {
                let start = pos;
                while pos < bytes.len() && bytes[pos] != b'%' {
                    pos += 1;
                }
                items.push(PatItem::Literal(src[start..pos].to_string()));
                continue;
            }
            let raw = *bytes.get(pos + 1).ok_or_else(|| invalid("truncated command"))?;
            let kind = match raw.to_ascii_lowercase() {
                b'x' => CmdKind::Token,
                b't' => CmdKind::Test,
                b'm' => CmdKind::Match,
                c => {
                    return Err(TagError::ModelCorrupt(format!(
                        "unknown command type '{}' in pattern: {src}",
                        c as char
                    )))
                }
            };
            let caps = raw.is_ascii_uppercase();
            pos += 2;
            if bytes.get(pos) != Some(&b'[') {
                return Err(invalid("missing '[' after command"));
            }
            pos += 1;
            let absolute = bytes.get(pos) == Some(&b'@');
            if absolute {
                pos += 1;
            }
            let offset = parse_i32(bytes, &mut pos).ok_or_else(|| invalid("invalid row offset"))?;
            if bytes.get(pos) != Some(&b',') {
                return Err(invalid("missing ',' between row and column"));
            }
            pos += 1;
            let column = parse_u32(bytes, &mut pos).ok_or_else(|| invalid("invalid column"))?;
            let regex = if kind != CmdKind::Token {
                if bytes.get(pos) != Some(&b',') || bytes.get(pos + 1) != Some(&b'"') {
                    return Err(invalid("missing regexp argument"));
                }
                pos += 2;
                let start = pos;
                while pos < bytes.len() && bytes[pos] != b'"' {
                    if bytes[pos] == b'\\' && pos + 1 < bytes.len() {
                        pos += 1;
                    }
                    pos += 1;
                }
                if bytes.get(pos) != Some(&b'"') {
                    return Err(invalid("unended regexp argument"));
                }
                let re = src[start..pos].to_string();
                pos += 1;
                rex::validate(&re).map_err(|reason| TagError::PatternInvalid {
                    pattern: src.clone(),
                    reason,
                })?;
                Some(re)
            } else {
                None
            };
            if bytes.get(pos) != Some(&b']') {
                return Err(invalid("missing end of command"));
            }
            pos += 1;
            items.push(PatItem::Command {
                kind,
                caps,
                absolute,
                offset,
                column,
                regex,
            });
        }
        Ok(Self { src, items })
    }

    pub(crate) fn src(&self) -> &str {
        &self.src
    }

    /// Apply the pattern at position `at` and build the observation string.
    pub(crate) fn exec(&self, tok: &TokSeq, at: usize) -> Result<String, TagError> {
        let t_len = tok.cols.len();
        let mut out: Vec<u8> = Vec::with_capacity(16);
        for item in &self.items {
            let before = out.len();
            match item {
                PatItem::Literal(text) => out.extend_from_slice(text.as_bytes()),
                PatItem::Command {
                    kind,
                    caps,
                    absolute,
                    offset,
                    column,
                    regex,
                } => {
                    let mut row = i64::from(*offset);
                    if *absolute {
                        if row < 0 {
                            row += t_len as i64;
                        } else {
                            row -= 1;
                        }
                    } else {
                        row += at as i64;
                    }
                    let value: &str = if row < 0 {
                        BVAL[((-row - 1) as usize).min(4)]
                    } else if row >= t_len as i64 {
                        EVAL[((row - t_len as i64) as usize).min(4)]
                    } else {
                        let cols = &tok.cols[row as usize];
                        cols.get(*column as usize).map(String::as_str).ok_or_else(|| {
                            TagError::DecodeFailed(
                                "missing tokens, cannot apply pattern".to_string(),
                            )
                        })?
                    };
                    match kind {
                        CmdKind::Token => out.extend_from_slice(value.as_bytes()),
                        CmdKind::Test => {
                            let re = regex.as_deref().unwrap_or("");
                            let hit = rex::find(re, value.as_bytes()).is_some();
                            out.extend_from_slice(if hit { b"true" } else { b"false" });
                        }
                        CmdKind::Match => {
                            let re = regex.as_deref().unwrap_or("");
                            if let Some((mpos, mlen)) = rex::find(re, value.as_bytes()) {
                                out.extend_from_slice(&value.as_bytes()[mpos..mpos + mlen]);
                            }
                        }
                    }
                    if *caps {
                        out[before..].make_ascii_lowercase();
                    }
                }
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

fn parse_i32(bytes: &[u8], pos: &mut usize) -> Option<i32> {
    let negative = bytes.get(*pos) == Some(&b'-');
    if negative || bytes.get(*pos) == Some(&b'+') {
        *pos += 1;
    }
    let value = parse_u32(bytes, pos)?;
    let value = i32::try_from(value).ok()?;
    Some(if negative { -value } else { value })
}

fn parse_u32(bytes: &[u8], pos: &mut usize) -> Option<u32> {
    let start = *pos;
    let mut value: u32 = 0;
    while let Some(d) = bytes.get(*pos).filter(|b| b.is_ascii_digit()) {
        value = value.checked_mul(10)?.checked_add(u32::from(d - b'0'))?;
        *pos += 1;
    }
    (*pos > start).then_some(value)
}

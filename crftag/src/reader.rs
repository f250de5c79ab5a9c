//! Model-file scanning and input-sequence interning.
//!
//! The reader owns everything needed to turn raw input lines into interned
//! sequences: the compiled feature templates and the label and observation
//! interners. Model files are parsed through a byte-buffer [`Scanner`]
//! (headers, netstrings, weight lines) instead of streaming stdio calls.
//!
//! Input conversion mirrors the original three-step shape: raw lines are
//! split into whitespace-separated columns (optionally peeling a trailing
//! label off each line), then every template is applied at every position and
//! the resulting observation strings are mapped to identifiers. Observations
//! unknown to the model are dropped silently.

use crate::pattern::Pattern;
use crate::quark::Quark;
use crate::TagError;

/// Cursor over an in-memory model file.
pub(crate) struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn skip_ws(&mut self) {
        while self
            .buf
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    /// Read up to (and consume) the next newline; returns the line without it.
    pub(crate) fn read_line(&mut self) -> Option<&'a str> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let rest = &self.buf[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        self.pos += end + usize::from(end < rest.len());
        std::str::from_utf8(&rest[..end]).ok()
    }

    /// Consume the literal after optional leading whitespace.
    pub(crate) fn expect_literal(&mut self, lit: &str) -> Result<(), TagError> {
        self.skip_ws();
        if self.buf[self.pos..].starts_with(lit.as_bytes()) {
            self.pos += lit.len();
            Ok(())
        } else {
            Err(TagError::ModelCorrupt(format!("expected '{lit}'")))
        }
    }

    /// Parse a decimal integer after optional leading whitespace.
    pub(crate) fn read_u64(&mut self) -> Option<u64> {
        self.skip_ws();
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(d) = self.buf.get(self.pos).filter(|b| b.is_ascii_digit()) {
            value = value.checked_mul(10)?.checked_add(u64::from(d - b'0'))?;
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    /// Read one byte.
    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        let b = self.buf.get(self.pos).copied();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    /// Read a netstring: `<len>:<payload>,` with an optional trailing
    /// newline. The payload length is exact; a mismatch is a corrupt model.
    pub(crate) fn read_netstring(&mut self) -> Result<String, TagError> {
        let len = self
            .read_u64()
            .ok_or_else(|| TagError::ModelCorrupt("invalid netstring length".to_string()))?;
        if self.read_byte() != Some(b':') {
            return Err(TagError::ModelCorrupt("invalid netstring".to_string()));
        }
        let len = usize::try_from(len)
            .ok()
            .filter(|&n| self.pos + n <= self.buf.len())
            .ok_or_else(|| TagError::ModelCorrupt("netstring too long".to_string()))?;
        let payload = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        if self.read_byte() != Some(b',') {
            return Err(TagError::ModelCorrupt("invalid netstring".to_string()));
        }
        if self.buf.get(self.pos) == Some(&b'\n') {
            self.pos += 1;
        }
        String::from_utf8(payload.to_vec())
            .map_err(|_| TagError::ModelCorrupt("netstring is not UTF-8".to_string()))
    }
}

/// A tokenized sequence: per position the whitespace-separated columns of the
/// input line, plus the peeled-off labels when the input is partly labeled.
pub(crate) struct TokSeq {
    pub(crate) cols: Vec<Vec<String>>,
    pub(crate) lbls: Option<Vec<String>>,
}

/// Interned observations for one position.
#[derive(Debug, Clone, Default)]
pub(crate) struct PosObs {
    /// Pinned label, when the input carried a known one.
    pub(crate) lbl: Option<u32>,
    pub(crate) uobs: Vec<u64>,
    pub(crate) bobs: Vec<u64>,
}

/// A sequence in decoder form.
#[derive(Debug, Clone, Default)]
pub(crate) struct Seq {
    pub(crate) pos: Vec<PosObs>,
}

impl Seq {
    pub(crate) fn len(&self) -> usize {
        self.pos.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Reader {
    pub(crate) pats: Vec<Pattern>,
    pub(crate) lbl: Quark,
    pub(crate) obs: Quark,
}

impl Reader {
    /// Load the reader section of a model file: the `#rdr#` header (with or
    /// without the trailing auto-unigram flag), the pattern sources, then the
    /// label and observation lists.
    pub(crate) fn load(&mut self, sc: &mut Scanner<'_>) -> Result<(), TagError> {
        let line = sc
            .read_line()
            .ok_or_else(|| TagError::ModelCorrupt("missing reader header".to_string()))?;
        let body = line
            .strip_prefix("#rdr#")
            .ok_or_else(|| TagError::ModelCorrupt("invalid reader format".to_string()))?;
        let fields: Vec<&str> = body.split('/').collect();
        if fields.len() != 2 && fields.len() != 3 {
            return Err(TagError::ModelCorrupt("invalid reader format".to_string()));
        }
        let npats: u32 = fields[0]
            .parse()
            .map_err(|_| TagError::ModelCorrupt("invalid reader format".to_string()))?;
        for _ in 0..npats {
            let src = sc.read_netstring()?;
            self.pats.push(Pattern::compile(src)?);
        }
        self.lbl.load(sc)?;
        self.obs.load(sc)?;
        Ok(())
    }

    /// Convert raw input lines into a decoder sequence. When `lbl` is true
    /// the last column of every line is taken as an already-known label.
    pub(crate) fn raw2seq(&self, lines: &[&str], lbl: bool) -> Result<Seq, TagError> {
        let mut tok = TokSeq {
            cols: Vec::with_capacity(lines.len()),
            lbls: lbl.then(|| Vec::with_capacity(lines.len())),
        };
        for line in lines {
            let mut cols: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if let Some(lbls) = tok.lbls.as_mut() {
                lbls.push(cols.pop().unwrap_or_default());
            }
            tok.cols.push(cols);
        }
        let mut seq = if self.pats.is_empty() {
            self.rawtok2seq(&tok)?
        } else {
            self.pattok2seq(&tok)?
        };
        if let Some(lbls) = &tok.lbls {
            for (pos, label) in seq.pos.iter_mut().zip(lbls) {
                pos.lbl = self
                    .lbl
                    .lookup(label)
                    .and_then(|id| u32::try_from(id).ok());
            }
        }
        Ok(seq)
    }

    // Without patterns the input columns are taken directly as observation
    // strings; their first character must declare the feature kind.
    fn rawtok2seq(&self, tok: &TokSeq) -> Result<Seq, TagError> {
        let mut seq = Seq {
            pos: vec![PosObs::default(); tok.cols.len()],
        };
        for (pos, cols) in seq.pos.iter_mut().zip(&tok.cols) {
            for obs in cols {
                let kind = match obs.as_bytes().first() {
                    Some(b'u') => 1u8,
                    Some(b'b') => 2,
                    Some(b'*') => 3,
                    _ => {
                        return Err(TagError::ModelCorrupt(format!("invalid feature: {obs}")))
                    }
                };
                let Some(id) = self.obs.lookup(obs) else { continue };
                if kind & 1 != 0 {
                    pos.uobs.push(id);
                }
                if kind & 2 != 0 {
                    pos.bobs.push(id);
                }
            }
        }
        Ok(seq)
    }

    // Apply every pattern at every position and intern the results.
    fn pattok2seq(&self, tok: &TokSeq) -> Result<Seq, TagError> {
        let t_len = tok.cols.len();
        let mut seq = Seq {
            pos: Vec::with_capacity(t_len),
        };
        for t in 0..t_len {
            let mut pos = PosObs::default();
            for pat in &self.pats {
                let obs = pat.exec(tok, t)?;
                let Some(id) = self.obs.lookup(&obs) else { continue };
                match obs.as_bytes().first() {
                    Some(b'u') => pos.uobs.push(id),
                    Some(b'b') => pos.bobs.push(id),
                    Some(b'*') => {
                        pos.uobs.push(id);
                        pos.bobs.push(id);
                    }
                    _ => {}
                }
            }
            seq.pos.push(pos);
        }
        Ok(seq)
    }
}

//! Trained model loading and synchronization.
//!
//! A model file is textual and endianness-free:
//!
//! ```text
//! #mdl#<type>#<nact>        (legacy form: #mdl#<nact>, type 0)
//! #rdr#<npats>/<ntoks>/<autouni>   (legacy form without the autouni field)
//! <npats netstring-encoded pattern sources>
//! #qrk#<count> + netstrings        (labels)
//! #qrk#<count> + netstrings        (observations)
//! <nact lines "feature_id=weight">
//! ```
//!
//! Weights are written by C `%a`, i.e. hex floats such as
//! `0x1.5bf0a8b145769p+1`; weights not listed are zero. Synchronization
//! derives the feature layout from the observation keys: a key starting with
//! `u` owns `Y` consecutive weights, `b` owns `Y²`, `*` both; the offsets
//! partition `[0, F)` disjointly. Rust float parsing never consults the
//! process locale, so no locale juggling is needed around the weight lines.

use std::path::Path;

use crate::reader::{Reader, Scanner};
use crate::TagError;

#[derive(Debug, Default)]
pub struct Model {
    /// Model type from the header; 1 selects pure max-ent decoding.
    pub(crate) mtype: i32,
    /// Y, number of labels.
    pub(crate) nlbl: u32,
    /// O, number of observations.
    pub(crate) nobs: u64,
    /// F, total number of feature weights.
    pub(crate) nftr: u64,
    /// Per-observation kind bits: 1 unigram, 2 bigram.
    pub(crate) kind: Vec<u8>,
    /// Per-observation offset of the Y unigram weights.
    pub(crate) uoff: Vec<u64>,
    /// Per-observation offset of the Y² bigram weights.
    pub(crate) boff: Vec<u64>,
    /// Dense feature-weight vector θ.
    pub(crate) theta: Vec<f64>,
    pub(crate) reader: Reader,
}

impl Model {
    /// Load a model from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TagError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| TagError::ModelUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    /// Load a model from an in-memory copy of a model file.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TagError> {
        let mut sc = Scanner::new(data);
        let line = sc
            .read_line()
            .ok_or_else(|| TagError::ModelCorrupt("invalid model format".to_string()))?;
        let body = line
            .strip_prefix("#mdl#")
            .ok_or_else(|| TagError::ModelCorrupt("invalid model format".to_string()))?;
        let fields: Vec<&str> = body.split('#').collect();
        let (mtype, nact) = match fields.as_slice() {
            [nact] => (0, nact.parse::<u64>()),
            [mtype, nact] => (
                mtype
                    .parse::<i32>()
                    .map_err(|_| TagError::ModelCorrupt("invalid model format".to_string()))?,
                nact.parse::<u64>(),
            ),
            _ => return Err(TagError::ModelCorrupt("invalid model format".to_string())),
        };
        let nact = nact.map_err(|_| TagError::ModelCorrupt("invalid model format".to_string()))?;

        let mut model = Model {
            mtype,
            ..Model::default()
        };
        model.reader.load(&mut sc)?;
        model.sync()?;
        for _ in 0..nact {
            let id = sc
                .read_u64()
                .ok_or_else(|| TagError::ModelCorrupt("invalid weight line".to_string()))?;
            if sc.read_byte() != Some(b'=') {
                return Err(TagError::ModelCorrupt("invalid weight line".to_string()));
            }
            let line = sc
                .read_line()
                .ok_or_else(|| TagError::ModelCorrupt("invalid weight line".to_string()))?;
            let value = parse_weight(line.trim())
                .ok_or_else(|| TagError::ModelCorrupt(format!("invalid weight: {line}")))?;
            if id >= model.nftr {
                return Err(TagError::ModelCorrupt(format!("invalid feature id: {id}")));
            }
            model.theta[id as usize] = value;
        }
        Ok(model)
    }

    // Derive the feature layout from the interned observations and lock both
    // interners against further insertions.
    fn sync(&mut self) -> Result<(), TagError> {
        let y = u32::try_from(self.reader.lbl.count())
            .map_err(|_| TagError::ModelCorrupt("too many labels".to_string()))?;
        let o = self.reader.obs.count();
        if y == 0 || o == 0 {
            return Err(TagError::ModelCorrupt(
                "cannot synchronize an empty model".to_string(),
            ));
        }
        self.nlbl = y;
        self.nobs = o;
        self.kind = vec![0; o as usize];
        self.uoff = vec![0; o as usize];
        self.boff = vec![0; o as usize];
        let mut f = 0u64;
        for i in 0..o as usize {
            let obs = self.reader.obs.id2str(i as u64).expect("interned id");
            let kind = match obs.as_bytes().first() {
                Some(b'u') => 1u8,
                Some(b'b') => 2,
                Some(b'*') => 3,
                _ => 0,
            };
            self.kind[i] = kind;
            if kind & 1 != 0 {
                self.uoff[i] = f;
                f += u64::from(y);
            }
            if kind & 2 != 0 {
                self.boff[i] = f;
                f += u64::from(y) * u64::from(y);
            }
        }
        self.nftr = f;
        self.theta = vec![0.0; f as usize];
        self.reader.lbl.lock(true);
        self.reader.obs.lock(true);
        Ok(())
    }

    /// Number of labels (Y).
    pub fn num_labels(&self) -> u32 {
        self.nlbl
    }

    /// Number of observations (O).
    pub fn num_observations(&self) -> u64 {
        self.nobs
    }

    /// Number of feature weights (F).
    pub fn num_features(&self) -> u64 {
        self.nftr
    }

    /// Resolve a label identifier to its name.
    pub fn label_name(&self, id: u32) -> Option<&str> {
        self.reader.lbl.id2str(u64::from(id))
    }
}

/// Parse a C99 `%a`-formatted hex float (`[-]0xH.HHHHp±D`) or a plain decimal
/// float.
pub(crate) fn parse_weight(s: &str) -> Option<f64> {
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = if rest.len() > 2 && rest[..2].eq_ignore_ascii_case("0x") {
        parse_hex_float(&rest[2..])?
    } else {
        rest.parse::<f64>().ok()?
    };
    Some(if negative { -value } else { value })
}

// Mantissa and binary exponent of the hex form, scaled by an exact power of
// two. Up to 14 significant hex digits (the 53-bit double mantissa plus the
// leading digit) accumulate exactly; further digits only shift the exponent.
fn parse_hex_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut mantissa = 0f64;
    let mut digits = 0u32;
    let mut frac_digits = 0i32;
    let mut seen_digit = false;
    let mut in_fraction = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'.' if !in_fraction => in_fraction = true,
            b'p' | b'P' => break,
            c if c.is_ascii_hexdigit() => {
                seen_digit = true;
                if digits < 16 {
                    mantissa = mantissa * 16.0 + f64::from((c as char).to_digit(16)?);
                    digits += 1;
                    if in_fraction {
                        frac_digits += 1;
                    }
                } else if !in_fraction {
                    frac_digits -= 1;
                }
            }
            _ => return None,
        }
        i += 1;
    }
    if !seen_digit {
        return None;
    }
    let exp = if i < bytes.len() {
        s[i + 1..].parse::<i32>().ok()?
    } else {
        0
    };
    // Power-of-two scaling is exact over the double exponent range.
    Some(mantissa * 2f64.powi(exp - 4 * frac_digits))
}

//! Sequence decoding: Ψ lattice computation, Viterbi, and posterior scoring.
//!
//! The transition lattice Ψ is a flat `T × Y × Y` buffer indexed by
//! `(t, y', y)`. For classical Viterbi it stays in log-space, so the weight
//! sums are used as-is; the max-ent and posterior paths exponentiate and the
//! Viterbi recursion then multiplies instead of adds.

use crate::model::Model;
use crate::reader::Seq;
use crate::vmath;
use crate::TagError;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DecodeOptions {
    pub(crate) maxent: bool,
    pub(crate) posterior: bool,
    pub(crate) force: bool,
}

pub(crate) struct Decoded {
    pub(crate) labels: Vec<u32>,
    /// Score of the best path.
    pub(crate) score: f64,
    /// Per-position score along the best path.
    pub(crate) pos_scores: Vec<f64>,
}

#[inline]
fn at(y: usize, t: usize, yp: usize, yv: usize) -> usize {
    (t * y + yp) * y + yv
}

// Fill psi with raw feature-weight sums (log-space): unigram contributions
// replicated across y', bigram contributions added for t >= 1.
fn fill_scores(mdl: &Model, seq: &Seq, psi: &mut [f64]) {
    let y = mdl.nlbl as usize;
    let t_len = seq.len();
    for t in 0..t_len {
        let pos = &seq.pos[t];
        for yv in 0..y {
            let mut sum = 0.0;
            for &o in &pos.uobs {
                sum += mdl.theta[(mdl.uoff[o as usize] + yv as u64) as usize];
            }
            for yp in 0..y {
                psi[at(y, t, yp, yv)] = sum;
            }
        }
    }
    for t in 1..t_len {
        let pos = &seq.pos[t];
        let mut d = 0u64;
        for yp in 0..y {
            for yv in 0..y {
                let mut sum = 0.0;
                for &o in &pos.bobs {
                    sum += mdl.theta[(mdl.boff[o as usize] + d) as usize];
                }
                psi[at(y, t, yp, yv)] += sum;
                d += 1;
            }
        }
    }
}

// Max-ent scoring: exponentiate and normalize every (t, y') row so each is a
// per-position conditional distribution. Linear-space output.
fn fill_memm_scores(mdl: &Model, seq: &Seq, psi: &mut [f64]) {
    let y = mdl.nlbl as usize;
    let t_len = seq.len();
    fill_scores(mdl, seq, psi);
    vmath::expma(psi, 0.0);
    for t in 0..t_len {
        for yp in 0..y {
            let row = &mut psi[at(y, t, yp, 0)..at(y, t, yp, 0) + y];
            let sum: f64 = row.iter().sum();
            for v in row {
                *v /= sum;
            }
        }
    }
}

// Posterior scoring: full forward-backward with per-position rescaling; the
// lattice is replaced by the position marginals. Linear-space output.
fn fill_posterior_scores(mdl: &Model, seq: &Seq, psi: &mut [f64]) -> Result<(), TagError> {
    let y = mdl.nlbl as usize;
    let t_len = seq.len();
    fill_scores(mdl, seq, psi);
    vmath::expma(psi, 0.0);

    let mut alpha = vec![0.0; t_len * y];
    let mut beta = vec![0.0; t_len * y];
    let mut scale = vec![0.0; t_len];
    alpha[..y].copy_from_slice(&psi[..y]);
    scale[0] = vmath::unit(&mut alpha[..y]);
    for t in 1..t_len {
        for yv in 0..y {
            let mut sum = 0.0;
            for yp in 0..y {
                sum += alpha[(t - 1) * y + yp] * psi[at(y, t, yp, yv)];
            }
            alpha[t * y + yv] = sum;
        }
        scale[t] = vmath::unit(&mut alpha[t * y..(t + 1) * y]);
    }
    for yp in 0..y {
        beta[(t_len - 1) * y + yp] = 1.0 / y as f64;
    }
    for t in (1..t_len).rev() {
        for yp in 0..y {
            let mut sum = 0.0;
            for yv in 0..y {
                sum += beta[t * y + yv] * psi[at(y, t, yp, yv)];
            }
            beta[(t - 1) * y + yp] = sum;
        }
        vmath::unit(&mut beta[(t - 1) * y..t * y]);
    }
    for t in 0..t_len {
        let mut z = 0.0;
        for yv in 0..y {
            z += alpha[t * y + yv] * beta[t * y + yv];
        }
        let unorm = 1.0 / z;
        if !unorm.is_finite() {
            return Err(TagError::DecodeFailed(
                "forward-backward normalization underflow".to_string(),
            ));
        }
        for yv in 0..y {
            let e = alpha[t * y + yv] * beta[t * y + yv] * unorm;
            for yp in 0..y {
                psi[at(y, t, yp, yv)] = e;
            }
        }
    }
    Ok(())
}

// Pin already-known labels: every arc entering or leaving another label at a
// pinned position is overwritten with the neutral element of the decoding
// semiring (0 in linear space, -inf in log-space).
fn apply_forced(seq: &Seq, psi: &mut [f64], y: usize, linear: bool) {
    let t_len = seq.len();
    let v = if linear { 0.0 } else { f64::NEG_INFINITY };
    for t in 0..t_len {
        let Some(cyr) = seq.pos[t].lbl else { continue };
        let cyr = cyr as usize;
        if t != 0 {
            for yv in (0..y).filter(|&yv| yv != cyr) {
                for yp in 0..y {
                    psi[at(y, t, yp, yv)] = v;
                }
            }
        }
        if t != t_len - 1 {
            for yv in (0..y).filter(|&yv| yv != cyr) {
                for yn in 0..y {
                    psi[at(y, t + 1, yv, yn)] = v;
                }
            }
        }
    }
    if let Some(yr) = seq.pos[0].lbl {
        for yv in (0..y).filter(|&yv| yv != yr as usize) {
            for yp in 0..y {
                psi[at(y, 0, yp, yv)] = v;
            }
        }
    }
}

/// Decode the most probable label path for the sequence.
pub(crate) fn viterbi(mdl: &Model, seq: &Seq, opt: DecodeOptions) -> Result<Decoded, TagError> {
    let y = mdl.nlbl as usize;
    let t_len = seq.len();
    if t_len == 0 {
        return Ok(Decoded {
            labels: Vec::new(),
            score: 0.0,
            pos_scores: Vec::new(),
        });
    }
    let mut psi = vec![0.0; t_len * y * y];
    let linear = if mdl.mtype == 1 || opt.maxent {
        fill_memm_scores(mdl, seq, &mut psi);
        true
    } else if opt.posterior {
        fill_posterior_scores(mdl, seq, &mut psi)?;
        true
    } else {
        fill_scores(mdl, seq, &mut psi);
        false
    };
    if opt.force {
        apply_forced(seq, &mut psi, y, linear);
    }

    // The Viterbi recursion mirrors the forward pass with the sum replaced by
    // a max; back-pointers record the arg-max so only the current and
    // previous α vectors are kept.
    let mut back = vec![0u32; t_len * y];
    let mut cur: Vec<f64> = (0..y).map(|yv| psi[at(y, 0, 0, yv)]).collect();
    let mut old = vec![0.0; y];
    for t in 1..t_len {
        old.copy_from_slice(&cur);
        for yv in 0..y {
            let mut bst = f64::NEG_INFINITY;
            let mut idx = 0u32;
            for yp in 0..y {
                let val = if linear {
                    old[yp] * psi[at(y, t, yp, yv)]
                } else {
                    old[yp] + psi[at(y, t, yp, yv)]
                };
                if val > bst {
                    bst = val;
                    idx = yp as u32;
                }
            }
            back[t * y + yv] = idx;
            cur[yv] = bst;
        }
    }

    let mut bst = 0usize;
    for yv in 1..y {
        if cur[yv] > cur[bst] {
            bst = yv;
        }
    }
    let score = cur[bst];
    let mut labels = vec![0u32; t_len];
    let mut pos_scores = vec![0.0; t_len];
    for t in (1..=t_len).rev() {
        let yp = if t != 1 { back[(t - 1) * y + bst] as usize } else { 0 };
        labels[t - 1] = bst as u32;
        pos_scores[t - 1] = psi[at(y, t - 1, yp, bst)];
        bst = yp;
    }
    Ok(Decoded {
        labels,
        score,
        pos_scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    // Two labels D/N with one unigram pattern; "a" scores 2.0 for D and "b"
    // scores 2.0 for N.
    const MODEL: &[u8] = b"#mdl#0#2\n\
                           #rdr#1/1/0\n\
                           9:u:%x[0,0],\n\
                           #qrk#2\n1:D,\n1:N,\n\
                           #qrk#2\n3:u:a,\n3:u:b,\n\
                           0=0x1p+1\n\
                           3=0x1p+1\n";

    #[test]
    fn best_path_score_and_position_scores() {
        let mdl = Model::from_bytes(MODEL).unwrap();
        let seq = mdl.reader.raw2seq(&["a", "b"], false).unwrap();
        let out = viterbi(&mdl, &seq, DecodeOptions::default()).unwrap();
        assert_eq!(out.labels, vec![0, 1]);
        assert_eq!(out.score, 4.0);
        assert_eq!(out.pos_scores, vec![2.0, 2.0]);
    }

    #[test]
    fn posterior_marginals_pick_the_same_labels() {
        let mdl = Model::from_bytes(MODEL).unwrap();
        let seq = mdl.reader.raw2seq(&["b", "a"], false).unwrap();
        let opt = DecodeOptions {
            posterior: true,
            ..DecodeOptions::default()
        };
        let out = viterbi(&mdl, &seq, opt).unwrap();
        assert_eq!(out.labels, vec![1, 0]);
        // Marginals are probabilities.
        assert!(out.pos_scores.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}

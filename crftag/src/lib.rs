//! crftag
//!
//! Inference-only linear-chain CRF sequence tagger. Loads models trained with
//! the Wapiti toolkit (textual model files, hex-float weights) and assigns a
//! label to every token of a sentence via Viterbi decoding, optionally with
//! posterior (forward-backward) scoring, pure max-ent scoring, or pinned
//! labels on partly labeled input.
//!
//! Training is out of scope; use the upstream toolkit to produce models.
//!
//! Public API:
//! - `Tagger` - facade: option setters, `load_model`, in-place `label`
//! - `Model` - a loaded model, shareable read-only between taggers
//! - `TagError` - structured error kinds

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

mod decoder;
mod model;
mod pattern;
mod quark;
mod reader;
mod rex;
mod vmath;

pub use model::Model;

/// Version of the model format this tagger implements.
pub const MODEL_VERSION: &str = "1.5.0";

#[derive(Debug, Error)]
pub enum TagError {
    /// The model file cannot be opened.
    #[error("cannot open model file {}: {source}", path.display())]
    ModelUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Malformed header, netstring, feature id or raw feature.
    #[error("corrupt model: {0}")]
    ModelCorrupt(String),
    /// A feature template failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    PatternInvalid { pattern: String, reason: String },
    /// Decoding one sequence failed; the caller may skip it and continue.
    #[error("decoding failed: {0}")]
    DecodeFailed(String),
}

/// Sequence tagger over a loaded CRF model.
///
/// The tagger itself only carries decoding options; the model is immutable
/// once loaded and can be shared between taggers on different threads.
#[derive(Debug, Default)]
pub struct Tagger {
    model: Option<Arc<Model>>,
    maxent: bool,
    posterior: bool,
    force: bool,
}

impl Tagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat the model as a pure maximum-entropy model: per-position
    /// conditional scoring without meaningful transitions.
    pub fn set_pure_maxent_mode(&mut self, enabled: bool) {
        self.maxent = enabled;
    }

    /// Decode with forward-backward posteriors instead of the classical
    /// Viterbi max-product. Slower, sometimes slightly more accurate.
    pub fn set_posterior_decoding(&mut self, enabled: bool) {
        self.posterior = enabled;
    }

    /// Treat the last whitespace-separated column of every input token as an
    /// already-known label; known labels pin the decoder at their position.
    pub fn set_partly_labeled_input(&mut self, enabled: bool) {
        self.force = enabled;
    }

    /// Load a model file. Replaces any previously loaded model.
    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> Result<(), TagError> {
        self.model = Some(Arc::new(Model::load(path)?));
        Ok(())
    }

    /// Use an already-loaded (possibly shared) model.
    pub fn set_model(&mut self, model: Arc<Model>) {
        self.model = Some(model);
    }

    /// The loaded model, if any.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_deref()
    }

    /// Label a sentence in place: the decoded label is appended to each
    /// token, separated by a single space.
    ///
    /// An empty sentence returns without modification. Sentences longer than
    /// `u32::MAX` tokens are truncated to that many; the remaining tokens are
    /// left unlabeled.
    pub fn label(&self, sentence: &mut [String]) -> Result<(), TagError> {
        self.label_with_scores(sentence).map(|_| ())
    }

    /// Like [`Tagger::label`], additionally returning the score of the
    /// decoded path and the per-position scores along it.
    pub fn label_with_scores(
        &self,
        sentence: &mut [String],
    ) -> Result<(f64, Vec<f64>), TagError> {
        let model = self
            .model
            .as_deref()
            .ok_or_else(|| TagError::DecodeFailed("no model loaded".to_string()))?;
        if sentence.is_empty() {
            return Ok((0.0, Vec::new()));
        }
        let limit = sentence.len().min(u32::MAX as usize);
        let lines: Vec<&str> = sentence[..limit].iter().map(String::as_str).collect();
        let seq = model.reader.raw2seq(&lines, self.force)?;
        let decoded = decoder::viterbi(
            model,
            &seq,
            decoder::DecodeOptions {
                maxent: self.maxent,
                posterior: self.posterior,
                force: self.force,
            },
        )?;
        for (token, &label) in sentence[..limit].iter_mut().zip(&decoded.labels) {
            let name = model
                .label_name(label)
                .ok_or_else(|| TagError::DecodeFailed(format!("invalid label id {label}")))?;
            token.reserve(name.len() + 1);
            token.push(' ');
            token.push_str(name);
        }
        Ok((decoded.score, decoded.pos_scores))
    }
}

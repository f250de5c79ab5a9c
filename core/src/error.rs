//! Error kinds surfaced to the host.
//!
//! Fatal kinds abort job start; `CorpusIncomplete` is recoverable (the
//! aggregator logs it and skips the corpus).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// No usable category remains after trimming, or a category query failed
    /// to compile.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The sentiment dictionary or emoji file cannot be loaded.
    #[error("cannot load dictionary {}: {reason}", path.display())]
    LexiconUnavailable { path: PathBuf, reason: String },

    /// A corpus is missing its date or sentence map.
    #[error("corpus #{number} does not have a {missing} map")]
    CorpusIncomplete { number: usize, missing: &'static str },
}

impl AnalyzerError {
    pub(crate) fn lexicon(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::LexiconUnavailable {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

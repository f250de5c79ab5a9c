//! libsentiment-core
//!
//! English text-sentiment analysis over pre-tokenized corpora: the sentiment
//! lexicon store, the VADER sentence analyzer and the time-bucketed
//! aggregation job. Crawling, tokenization and persistence are external
//! collaborators; this crate consumes in-memory corpora and hands finished
//! rows to a sink interface.
//!
//! Public API:
//! - `Corpus`, `Sentence`, `TextMapEntry` - corpus data model
//! - `Lexicon` - dictionary and emoji maps, shared read-only across jobs
//! - `Sentiment`, `SentimentScores` - sentence-level VADER scoring
//! - `SentimentOverTime` - the per-job aggregation driver
//! - `AnalyzerConfig` - configuration with TOML helpers
//! - `StatusHandler`, `ResultSink` - host interfaces

use serde::{Deserialize, Serialize};

pub mod aggregator;
pub use aggregator::{SentimentOverTime, Tick};

pub mod corpus;
pub use corpus::{Corpus, Sentence, TextMap, TextMapEntry};

pub mod error;
pub use error::AnalyzerError;

pub mod lexicon;
pub use lexicon::Lexicon;

pub mod progress;
pub use progress::{NullStatus, StatusHandler};

pub mod sink;
pub use sink::{CategoryResult, MemorySink, OutputRow, ResultSink};

pub mod vader;
pub use vader::{Sentiment, SentimentScores};

/// Resolution of the date bucket keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateResolution {
    /// `YYYY`
    Year,
    /// `YYYY-MM`
    Month,
    /// `YYYY-MM-DD`
    Day,
}

/// Truncate a date string to the given resolution. Shorter strings are left
/// unchanged; the empty string stays empty.
pub fn reduce_date(date: &mut String, resolution: DateResolution) {
    let keep = match resolution {
        DateResolution::Year => 4,
        DateResolution::Month => 7,
        DateResolution::Day => 10,
    };
    if date.len() > keep {
        date.truncate(keep);
    }
}

/// Configuration of a sentiment-over-time job.
///
/// `category_labels` and `category_queries` are parallel arrays: category `i`
/// carries the human-readable label `category_labels[i]` and matches at a
/// token iff the regular expression `category_queries[i]` matches it. An
/// empty query string means "no query defined".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Ordered, human-readable category names.
    pub category_labels: Vec<String>,
    /// Parallel regular expressions; a category matches a sentence if any of
    /// its tokens matches.
    pub category_queries: Vec<String>,
    /// Also compute per-article scores and include them in the output rows.
    pub add_article_sentiment: bool,
    /// Skip sentences without a (truncated) date.
    pub ignore_empty_date: bool,
    /// Threshold in percent; a sentence counts only if
    /// `round(|compound| * 100)` reaches it.
    pub threshold: u8,
    /// Gate sentence inclusion by `threshold`.
    pub use_threshold: bool,
    /// Resolution of the date bucket keys.
    pub group_date_resolution: DateResolution,
    /// Sentiment dictionary file name under the dictionary directory.
    pub dictionary: String,
    /// Emoji dictionary file name under the dictionary directory.
    pub emojis: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            category_labels: Vec::new(),
            category_queries: Vec::new(),
            add_article_sentiment: false,
            ignore_empty_date: true,
            // Sentiments below 10 percent are ignored when the threshold is
            // enabled.
            threshold: 10,
            use_threshold: false,
            group_date_resolution: DateResolution::Day,
            dictionary: "sentiment-en".to_string(),
            emojis: "emojis-en".to_string(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalyzerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

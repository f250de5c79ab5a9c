//! Average sentiment over time for configurable categories.
//!
//! The job walks every corpus sentence by sentence, matches the category
//! queries against the sentence tokens, scores matching sentences once with
//! the VADER analyzer and accumulates per-(date bucket, category) sums. After
//! the last corpus, one row per bucket is handed to the sink in sorted key
//! order, optionally extended with per-article figures.
//!
//! The host pumps the job tick by tick: each tick processes one corpus (or
//! emits the results) and the job stays responsive to the host's is-running
//! flag at a coarse progress granularity.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use regex::Regex;
use tracing::{info, warn};

use crate::corpus::{Corpus, Sentence, TextMap};
use crate::error::AnalyzerError;
use crate::lexicon::Lexicon;
use crate::progress::StatusHandler;
use crate::sink::{CategoryResult, OutputRow, ResultSink};
use crate::vader::Sentiment;
use crate::{reduce_date, AnalyzerConfig};

/// While calculating, update progress after this many sentences.
const UPDATE_CALCULATE_PROGRESS_EVERY: usize = 250_000;

/// While saving, update progress after this many rows.
const UPDATE_SAVING_PROGRESS_EVERY: usize = 10;

/// Factor converting a compound score to a percentage.
const PERCENTAGE_FACTOR: f32 = 100.0;

// Accumulator for one (date bucket, category) pair.
#[derive(Debug, Clone, Default)]
struct DateCategoryData {
    sentiment_sum: f64,
    sentiment_count: u64,
    // Sorted so that article means accumulate in a deterministic order.
    articles: BTreeSet<String>,
}

type DateData = BTreeMap<String, Vec<DateCategoryData>>;
type ArticleData = AHashMap<String, (f64, u64)>;

/// Outcome of one driver tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A corpus was processed; call again.
    Working,
    /// All corpora are processed and the results have been emitted.
    Finished,
}

/// A sentiment-over-time analysis job.
///
/// One job is single-threaded and owns its accumulators; the lexicon behind
/// the analyzer is shared read-only between jobs.
#[derive(Debug)]
pub struct SentimentOverTime<'a> {
    config: AnalyzerConfig,
    queries: Vec<Regex>,
    analyzer: Sentiment,
    corpora: &'a [Corpus],
    current_corpus: usize,
    date_data: DateData,
    article_data: ArticleData,
    finished: bool,
}

impl<'a> SentimentOverTime<'a> {
    /// Create a job, loading the dictionary and emoji files named by the
    /// configuration from `dict_dir`.
    pub fn new(
        config: AnalyzerConfig,
        corpora: &'a [Corpus],
        dict_dir: &Path,
    ) -> Result<Self, AnalyzerError> {
        let lexicon = Lexicon::load(
            dict_dir.join(&config.dictionary),
            dict_dir.join(&config.emojis),
        )?;
        Self::with_lexicon(config, corpora, Arc::new(lexicon))
    }

    /// Create a job over an already-loaded (possibly shared) lexicon.
    ///
    /// Validates the category configuration: the label and query lists are
    /// trimmed to their common prefix and positions with an empty label or
    /// empty query are dropped; at least one category must remain.
    pub fn with_lexicon(
        mut config: AnalyzerConfig,
        corpora: &'a [Corpus],
        lexicon: Arc<Lexicon>,
    ) -> Result<Self, AnalyzerError> {
        if config.category_queries.iter().all(String::is_empty) {
            return Err(AnalyzerError::ConfigInvalid("no category defined".to_string()));
        }

        let complete = config.category_labels.len().min(config.category_queries.len());
        if config.category_labels.len() > complete || config.category_queries.len() > complete {
            config.category_labels.truncate(complete);
            config.category_queries.truncate(complete);
            warn!(
                "'category_labels' and 'category_queries' \
                 should have the same number of elements."
            );
        }

        let before = config.category_labels.len();
        let (labels, queries): (Vec<String>, Vec<String>) = config
            .category_labels
            .drain(..)
            .zip(config.category_queries.drain(..))
            .filter(|(label, query)| !label.is_empty() && !query.is_empty())
            .unzip();
        if labels.len() != before {
            warn!("Incomplete categories removed from configuration.");
        }
        if labels.is_empty() {
            return Err(AnalyzerError::ConfigInvalid("no category defined".to_string()));
        }
        config.category_labels = labels;
        config.category_queries = queries;

        let queries = config
            .category_queries
            .iter()
            .map(|query| {
                Regex::new(query).map_err(|e| {
                    AnalyzerError::ConfigInvalid(format!("category query '{query}': {e}"))
                })
            })
            .collect::<Result<Vec<Regex>, AnalyzerError>>()?;

        Ok(Self {
            config,
            queries,
            analyzer: Sentiment::new(lexicon),
            corpora,
            current_corpus: 0,
            date_data: DateData::new(),
            article_data: ArticleData::new(),
            finished: false,
        })
    }

    /// The validated configuration the job runs with.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Whether the results have been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Process one corpus, or emit the results once all corpora are done.
    pub fn tick(&mut self, status: &mut dyn StatusHandler, sink: &mut dyn ResultSink) -> Tick {
        if self.current_corpus < self.corpora.len() {
            self.add_current(status);
            self.current_corpus += 1;
            Tick::Working
        } else {
            if !self.finished {
                self.save_sentiments(status, sink);
                if status.is_running() {
                    self.finished = true;
                }
            }
            Tick::Finished
        }
    }

    /// Drive ticks until the job finishes or the host cancels it.
    pub fn run(&mut self, status: &mut dyn StatusHandler, sink: &mut dyn ResultSink) {
        while status.is_running() {
            if self.tick(status, sink) == Tick::Finished {
                break;
            }
        }
    }

    // Accumulate dates, sentence scores and articles from the current corpus.
    fn add_current(&mut self, status: &mut dyn StatusHandler) {
        let number = self.current_corpus;
        let corpora = self.corpora;
        let corpus = &corpora[number];

        let mut what = String::from("category occurrences");
        if corpora.len() > 1 {
            what.push_str(&format!(" in corpus #{}/{}", number + 1, corpora.len()));
        }
        status.set_status(&format!("Identifying {what}..."));
        status.set_progress(0.0);
        info!("identifies {what}...");

        if corpus.dates.is_empty() {
            warn!(
                "{}, skipped",
                AnalyzerError::CorpusIncomplete {
                    number: number + 1,
                    missing: "date",
                }
            );
            return;
        }
        if corpus.sentences.is_empty() {
            warn!(
                "{}, skipped",
                AnalyzerError::CorpusIncomplete {
                    number: number + 1,
                    missing: "sentence",
                }
            );
            return;
        }

        let mut process_articles = self.config.add_article_sentiment;
        if corpus.articles.is_empty() && process_articles {
            warn!("corpus #{} does not have an article map", number + 1);
            process_articles = false;
        }

        let config = &self.config;
        let queries = &self.queries;
        let analyzer = &self.analyzer;
        let date_data = &mut self.date_data;
        let categories = queries.len();

        let mut date_number = 0usize;
        let mut article_number = 0usize;
        let mut last_date = false;
        let mut last_article = false;

        // Select and add the first (or the empty) date bucket.
        let mut current_key = if select_first(&corpus.dates, &mut date_number) {
            let mut first = corpus.dates[0].value.clone();
            reduce_date(&mut first, config.group_date_resolution);
            first
        } else {
            String::new()
        };
        add_date(date_data, &current_key, categories);

        if process_articles {
            select_first(&corpus.articles, &mut article_number);
        }

        let mut status_counter = 0usize;
        let mut result_counter = 0usize;

        for sentence in &corpus.sentences {
            if identify_current(sentence.begin, &mut date_number, &corpus.dates, &mut last_date) {
                // Date changed: reduce the new date for grouping.
                let mut reduced = String::new();
                if date_number > 0 {
                    reduced = corpus.dates[date_number - 1].value.clone();
                    reduce_date(&mut reduced, config.group_date_resolution);
                }
                add_date(date_data, &reduced, categories);
                current_key = reduced;
            }

            if config.ignore_empty_date && current_key.is_empty() {
                continue;
            }

            if process_articles {
                identify_current(
                    sentence.begin,
                    &mut article_number,
                    &corpus.articles,
                    &mut last_article,
                );
            }
            let article = if article_number > 0 {
                corpus.articles[article_number - 1].value.as_str()
            } else {
                ""
            };

            let data = date_data.get_mut(&current_key).expect("bucket added above");
            process_sentence(analyzer, queries, config, corpus, sentence, data, article);

            status_counter += 1;
            result_counter += 1;
            if status_counter == UPDATE_CALCULATE_PROGRESS_EVERY {
                status.set_progress(result_counter as f32 / corpus.sentences.len() as f32);
                status_counter = 0;
            }
            if !status.is_running() {
                return;
            }
        }
    }

    // Compute the final figures and hand one row per bucket to the sink.
    fn save_sentiments(&mut self, status: &mut dyn StatusHandler, sink: &mut dyn ResultSink) {
        status.set_status("Calculating and saving results...");
        status.set_progress(0.0);
        info!("calculates and saves results...");

        let config = &self.config;
        let analyzer = &self.analyzer;
        let corpora = self.corpora;
        let article_data = &mut self.article_data;
        let total = self.date_data.len();

        let mut status_counter = 0usize;
        let mut result_counter = 0usize;

        for (date, categories) in &self.date_data {
            if date.is_empty() && config.ignore_empty_date {
                continue;
            }

            let mut row = OutputRow {
                date: date.clone(),
                categories: Vec::with_capacity(config.category_labels.len()),
            };
            for (label, data) in config.category_labels.iter().zip(categories) {
                let mean = if data.sentiment_count > 0 {
                    data.sentiment_sum / data.sentiment_count as f64
                } else {
                    0.0
                };
                let (article_count, article_mean) = if config.add_article_sentiment {
                    let (sum, count) = calculate_article_sentiment(
                        &data.articles,
                        article_data,
                        corpora,
                        analyzer,
                        config,
                    );
                    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
                    (Some(count), Some(mean))
                } else {
                    (None, None)
                };
                row.categories.push(CategoryResult {
                    label: label.clone(),
                    count: data.sentiment_count,
                    mean,
                    article_count,
                    article_mean,
                });
            }
            sink.push(row);

            status_counter += 1;
            result_counter += 1;
            if status_counter == UPDATE_SAVING_PROGRESS_EVERY {
                status.set_progress(result_counter as f32 / total as f32);
                status_counter = 0;
            }
            if !status.is_running() {
                return;
            }
        }
    }
}

// Create the bucket for a date key unless it already exists.
fn add_date(date_data: &mut DateData, date: &str, categories: usize) {
    if !date_data.contains_key(date) {
        date_data.insert(
            date.to_string(),
            vec![DateCategoryData::default(); categories],
        );
    }
}

// Match, score and accumulate one sentence. The sentence is scored at most
// once; the memoized score is reused across categories.
fn process_sentence(
    analyzer: &Sentiment,
    queries: &[Regex],
    config: &AnalyzerConfig,
    corpus: &Corpus,
    sentence: &Sentence,
    data: &mut [DateCategoryData],
    article: &str,
) {
    let tokens = corpus.sentence_tokens(sentence);
    let mut to_analyze = true;
    let mut sentiment = 0f32;
    let mut meets = false;

    for (category, query) in queries.iter().enumerate() {
        let found = tokens.iter().any(|token| query.is_match(token));
        if !found {
            continue;
        }
        if to_analyze {
            sentiment = analyzer.analyze(tokens).compound;
            if config.use_threshold {
                meets = meets_threshold(sentiment, config.threshold);
            }
            to_analyze = false;
        }
        let entry = &mut data[category];
        if !config.use_threshold || meets {
            entry.sentiment_sum += f64::from(sentiment);
            entry.sentiment_count += 1;
        }
        if !article.is_empty() {
            entry.articles.insert(article.to_string());
        }
    }
}

// Sum of per-article mean scores and the number of articles, computing and
// memoizing each article on first use. The cache keys on the article id
// alone: an article's score depends only on its token range and the
// threshold, never on the category.
fn calculate_article_sentiment(
    articles: &BTreeSet<String>,
    article_data: &mut ArticleData,
    corpora: &[Corpus],
    analyzer: &Sentiment,
    config: &AnalyzerConfig,
) -> (f64, u64) {
    let mut sum = 0f64;
    let mut count = 0u64;
    for article in articles {
        let (article_sum, article_count) = match article_data.get(article) {
            Some(&cached) => cached,
            None => {
                let computed = calculate_article(article, corpora, analyzer, config);
                article_data.insert(article.clone(), computed);
                computed
            }
        };
        if article_count > 0 {
            sum += article_sum / article_count as f64;
        }
        count += 1;
    }
    (sum, count)
}

// Sum and count of the (thresholded) sentence scores of one article, found by
// scanning every corpus for its token range.
fn calculate_article(
    article: &str,
    corpora: &[Corpus],
    analyzer: &Sentiment,
    config: &AnalyzerConfig,
) -> (f64, u64) {
    let mut sum = 0f64;
    let mut count = 0u64;
    for corpus in corpora {
        let Some(entry) = corpus.articles.iter().find(|e| e.value == article) else {
            continue;
        };
        let article_end = entry.end();
        let sentences = corpus
            .sentences
            .iter()
            .skip_while(|s| !(s.begin >= entry.begin && s.end() <= article_end));
        for sentence in sentences {
            if sentence.end() > article_end {
                break;
            }
            let sentiment = analyzer.analyze(corpus.sentence_tokens(sentence)).compound;
            if !config.use_threshold || meets_threshold(sentiment, config.threshold) {
                sum += f64::from(sentiment);
                count += 1;
            }
        }
    }
    (sum, count)
}

// Select the first map entry when it starts the token stream; `number` is the
// one-based entry cursor, zero meaning "no current entry".
fn select_first(map: &TextMap, number: &mut usize) -> bool {
    if !map.is_empty() && map[0].begin == 0 {
        *number = 1;
        return true;
    }
    false
}

// Advance the map cursor to the entry covering the sentence start; returns
// whether the current entry changed. Once the sentence lies behind the last
// entry the cursor drops to zero and stays there.
fn identify_current(
    sentence_begin: usize,
    number: &mut usize,
    map: &TextMap,
    is_last: &mut bool,
) -> bool {
    if *is_last {
        return false;
    }
    let mut current_end = 0usize;
    let mut changed = false;
    if *number > 0 {
        current_end = map[*number - 1].end();
    }
    while sentence_begin >= current_end && map.len() > *number {
        *number += 1;
        changed = true;
        current_end = map[*number - 1].end();
    }
    if sentence_begin >= current_end && current_end > 0 {
        *number = 0;
        *is_last = true;
        changed = true;
    }
    changed
}

// Inclusion test against the configured integer percentage threshold.
fn meets_threshold(sentiment: f32, threshold: u8) -> bool {
    (sentiment.abs() * PERCENTAGE_FACTOR).round() as u8 >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::TextMapEntry;

    fn map(entries: &[(usize, usize, &str)]) -> TextMap {
        entries
            .iter()
            .map(|&(begin, length, value)| TextMapEntry::new(begin, length, value))
            .collect()
    }

    #[test]
    fn select_first_requires_start_at_zero() {
        let mut number = 0;
        assert!(select_first(&map(&[(0, 5, "a")]), &mut number));
        assert_eq!(number, 1);
        number = 0;
        assert!(!select_first(&map(&[(3, 5, "a")]), &mut number));
        assert_eq!(number, 0);
        assert!(!select_first(&map(&[]), &mut number));
    }

    #[test]
    fn identify_current_advances_and_stops() {
        let entries = map(&[(0, 4, "a"), (4, 4, "b"), (10, 2, "c")]);
        let mut number = 1;
        let mut last = false;
        // Still inside the first entry.
        assert!(!identify_current(2, &mut number, &entries, &mut last));
        assert_eq!(number, 1);
        // Into the second entry.
        assert!(identify_current(4, &mut number, &entries, &mut last));
        assert_eq!(number, 2);
        // Into the gap: the cursor moves to the next entry even though the
        // sentence is not covered by it yet.
        assert!(identify_current(8, &mut number, &entries, &mut last));
        assert_eq!(number, 3);
        // Behind the last entry.
        assert!(identify_current(12, &mut number, &entries, &mut last));
        assert_eq!(number, 0);
        assert!(last);
        // Stays stopped.
        assert!(!identify_current(13, &mut number, &entries, &mut last));
    }

    #[test]
    fn threshold_rounds_the_percentage() {
        assert!(meets_threshold(0.1, 10));
        assert!(!meets_threshold(0.04, 10));
        assert!(meets_threshold(-0.5, 10));
        assert!(meets_threshold(0.0, 0));
    }
}

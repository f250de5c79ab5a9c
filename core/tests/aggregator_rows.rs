//! Aggregation-job scenarios: bucket grouping, thresholds, article figures,
//! configuration trimming and determinism.

use std::sync::Arc;

use libsentiment_core::{
    AnalyzerConfig, AnalyzerError, Corpus, DateResolution, Lexicon, MemorySink, NullStatus,
    Sentence, Sentiment, SentimentOverTime, StatusHandler, TextMapEntry, Tick,
};

fn lexicon() -> Arc<Lexicon> {
    let dict = [
        ("good", 1.9f32),
        ("great", 3.1),
        ("terrible", -2.1),
        ("bad", -2.5),
    ];
    Arc::new(Lexicon::from_entries(
        dict.iter().map(|&(t, v)| (t.to_string(), v)),
        std::iter::empty(),
    ))
}

fn tokens(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

// Three dated sentences; a "films" category matches each of them.
fn films_corpus() -> Corpus {
    Corpus {
        tokens: tokens(&[
            "the", "movie", "was", "good", // sentence 1
            "the", "film", "was", "terrible", // sentence 2
            "a", "good", "movie", // sentence 3
        ]),
        sentences: vec![
            Sentence::new(0, 4),
            Sentence::new(4, 4),
            Sentence::new(8, 3),
        ],
        dates: vec![
            TextMapEntry::new(0, 4, "2020-01-03"),
            TextMapEntry::new(4, 4, "2020-01-17"),
            TextMapEntry::new(8, 3, "2020-02-05"),
        ],
        articles: vec![
            TextMapEntry::new(0, 8, "art1"),
            TextMapEntry::new(8, 3, "art2"),
        ],
    }
}

fn films_config() -> AnalyzerConfig {
    AnalyzerConfig {
        category_labels: vec!["films".to_string()],
        category_queries: vec!["movie|film".to_string()],
        group_date_resolution: DateResolution::Month,
        ..AnalyzerConfig::default()
    }
}

fn run_job(config: AnalyzerConfig, corpora: &[Corpus]) -> MemorySink {
    let mut job = SentimentOverTime::with_lexicon(config, corpora, lexicon()).unwrap();
    let mut sink = MemorySink::default();
    job.run(&mut NullStatus, &mut sink);
    assert!(job.is_finished());
    sink
}

fn compound(corpus: &Corpus, sentence: usize) -> f64 {
    let analyzer = Sentiment::new(lexicon());
    let s = corpus.sentences[sentence];
    f64::from(
        analyzer
            .analyze(&corpus.tokens[s.begin..s.begin + s.length])
            .compound,
    )
}

#[test]
fn groups_by_month_in_sorted_order() {
    let corpus = films_corpus();
    let sink = run_job(films_config(), std::slice::from_ref(&corpus));

    assert_eq!(sink.rows.len(), 2);
    assert_eq!(sink.rows[0].date, "2020-01");
    assert_eq!(sink.rows[1].date, "2020-02");

    let january = &sink.rows[0].categories[0];
    assert_eq!(january.label, "films");
    assert_eq!(january.count, 2);
    let expected = (compound(&corpus, 0) + compound(&corpus, 1)) / 2.0;
    assert!((january.mean - expected).abs() < 1e-12);

    let february = &sink.rows[1].categories[0];
    assert_eq!(february.count, 1);
    assert!((february.mean - compound(&corpus, 2)).abs() < 1e-12);
}

#[test]
fn non_matching_category_counts_nothing() {
    let corpus = films_corpus();
    let mut config = films_config();
    config.category_labels.push("weather".to_string());
    config.category_queries.push("rain|snow".to_string());
    let sink = run_job(config, std::slice::from_ref(&corpus));
    for row in &sink.rows {
        let weather = &row.categories[1];
        assert_eq!(weather.count, 0);
        assert_eq!(weather.mean, 0.0);
    }
}

#[test]
fn threshold_gates_weak_sentences() {
    // "was it a movie" carries no sentiment words, so its compound is zero
    // and it fails any non-zero threshold; the others pass easily.
    let corpus = Corpus {
        tokens: tokens(&["the", "movie", "was", "good", "was", "it", "a", "movie"]),
        sentences: vec![Sentence::new(0, 4), Sentence::new(4, 4)],
        dates: vec![TextMapEntry::new(0, 8, "2021-06-01")],
        articles: Vec::new(),
    };
    let mut config = films_config();
    config.use_threshold = true;
    config.threshold = 10;
    let sink = run_job(config, std::slice::from_ref(&corpus));
    assert_eq!(sink.rows.len(), 1);
    assert_eq!(sink.rows[0].categories[0].count, 1);
}

#[test]
fn empty_dates_are_skipped_or_bucketed() {
    // The date map ends at token 4, so the second sentence is undated.
    let corpus = Corpus {
        tokens: tokens(&["the", "movie", "was", "bad", "a", "good", "movie", "here"]),
        sentences: vec![Sentence::new(0, 4), Sentence::new(4, 4)],
        dates: vec![TextMapEntry::new(0, 4, "2022-03-14")],
        articles: Vec::new(),
    };
    let mut config = films_config();
    config.ignore_empty_date = true;
    let sink = run_job(config.clone(), std::slice::from_ref(&corpus));
    assert_eq!(sink.rows.len(), 1);
    assert_eq!(sink.rows[0].date, "2022-03");
    assert_eq!(sink.rows[0].categories[0].count, 1);

    config.ignore_empty_date = false;
    let sink = run_job(config, std::slice::from_ref(&corpus));
    assert_eq!(sink.rows.len(), 2);
    assert_eq!(sink.rows[0].date, "");
    assert_eq!(sink.rows[0].categories[0].count, 1);
    assert_eq!(sink.rows[1].date, "2022-03");
}

#[test]
fn article_figures_are_means_of_article_means() {
    let corpus = films_corpus();
    let mut config = films_config();
    config.add_article_sentiment = true;
    config.group_date_resolution = DateResolution::Year;
    let sink = run_job(config, std::slice::from_ref(&corpus));

    assert_eq!(sink.rows.len(), 1);
    let films = &sink.rows[0].categories[0];
    assert_eq!(films.count, 3);
    assert_eq!(films.article_count, Some(2));
    // art1 covers sentences 1 and 2, art2 covers sentence 3.
    let art1 = (compound(&corpus, 0) + compound(&corpus, 1)) / 2.0;
    let art2 = compound(&corpus, 2);
    let expected = (art1 + art2) / 2.0;
    assert!((films.article_mean.unwrap() - expected).abs() < 1e-12);
}

#[test]
fn rows_without_article_sentiment_have_no_article_figures() {
    let corpus = films_corpus();
    let sink = run_job(films_config(), std::slice::from_ref(&corpus));
    assert_eq!(sink.rows[0].categories[0].article_count, None);
    assert_eq!(sink.rows[0].categories[0].article_mean, None);
}

#[test]
fn corpora_accumulate_into_shared_buckets() {
    let first = films_corpus();
    let second = Corpus {
        tokens: tokens(&["that", "movie", "was", "great"]),
        sentences: vec![Sentence::new(0, 4)],
        dates: vec![TextMapEntry::new(0, 4, "2020-01-20")],
        articles: Vec::new(),
    };
    let corpora = vec![first.clone(), second.clone()];
    let sink = run_job(films_config(), &corpora);
    assert_eq!(sink.rows.len(), 2);
    let january = &sink.rows[0].categories[0];
    assert_eq!(january.count, 3);
    let expected =
        (compound(&first, 0) + compound(&first, 1) + compound(&second, 0)) / 3.0;
    assert!((january.mean - expected).abs() < 1e-12);
}

#[test]
fn corpus_without_a_date_map_is_skipped() {
    let undated = Corpus {
        tokens: tokens(&["a", "good", "movie"]),
        sentences: vec![Sentence::new(0, 3)],
        dates: Vec::new(),
        articles: Vec::new(),
    };
    let corpora = vec![undated, films_corpus()];
    let sink = run_job(films_config(), &corpora);
    // Only the dated corpus contributes.
    assert_eq!(sink.rows.len(), 2);
    assert_eq!(
        sink.rows.iter().map(|r| r.categories[0].count).sum::<u64>(),
        3
    );
}

#[test]
fn rows_are_deterministic_across_runs() {
    let corpus = films_corpus();
    let mut config = films_config();
    config.add_article_sentiment = true;
    let first = run_job(config.clone(), std::slice::from_ref(&corpus));
    let second = run_job(config, std::slice::from_ref(&corpus));
    assert_eq!(first.rows, second.rows);
}

#[test]
fn config_without_queries_is_invalid() {
    let config = AnalyzerConfig {
        category_labels: vec!["films".to_string()],
        category_queries: vec![String::new()],
        ..AnalyzerConfig::default()
    };
    let corpus = films_corpus();
    let err = SentimentOverTime::with_lexicon(config, std::slice::from_ref(&corpus), lexicon())
        .unwrap_err();
    assert!(matches!(err, AnalyzerError::ConfigInvalid(_)));
}

#[test]
fn parallel_arrays_are_trimmed_and_cleaned() {
    let config = AnalyzerConfig {
        category_labels: vec![
            "films".to_string(),
            String::new(),
            "books".to_string(),
            "dangling".to_string(),
        ],
        category_queries: vec![
            "movie".to_string(),
            "orphaned".to_string(),
            "book".to_string(),
        ],
        ..AnalyzerConfig::default()
    };
    let corpus = films_corpus();
    let job =
        SentimentOverTime::with_lexicon(config, std::slice::from_ref(&corpus), lexicon()).unwrap();
    // "dangling" has no query and is trimmed; the empty label drops the
    // "orphaned" query with it.
    assert_eq!(job.config().category_labels, vec!["films", "books"]);
    assert_eq!(job.config().category_queries, vec!["movie", "book"]);
}

#[test]
fn invalid_query_regex_is_config_invalid() {
    let config = AnalyzerConfig {
        category_labels: vec!["films".to_string()],
        category_queries: vec!["(".to_string()],
        ..AnalyzerConfig::default()
    };
    let corpus = films_corpus();
    let err = SentimentOverTime::with_lexicon(config, std::slice::from_ref(&corpus), lexicon())
        .unwrap_err();
    assert!(matches!(err, AnalyzerError::ConfigInvalid(_)));
}

struct Cancelled;

impl StatusHandler for Cancelled {
    fn is_running(&self) -> bool {
        false
    }
}

#[test]
fn cancellation_emits_nothing() {
    let corpus = films_corpus();
    let mut job =
        SentimentOverTime::with_lexicon(films_config(), std::slice::from_ref(&corpus), lexicon())
            .unwrap();
    let mut sink = MemorySink::default();
    job.run(&mut Cancelled, &mut sink);
    assert!(sink.rows.is_empty());
    assert!(!job.is_finished());
}

#[test]
fn tick_processes_one_corpus_at_a_time() {
    let corpora = vec![films_corpus(), films_corpus()];
    let mut job =
        SentimentOverTime::with_lexicon(films_config(), &corpora, lexicon()).unwrap();
    let mut sink = MemorySink::default();
    let mut status = NullStatus;
    assert_eq!(job.tick(&mut status, &mut sink), Tick::Working);
    assert_eq!(job.tick(&mut status, &mut sink), Tick::Working);
    assert!(sink.rows.is_empty());
    assert_eq!(job.tick(&mut status, &mut sink), Tick::Finished);
    assert_eq!(sink.rows.len(), 2);
    assert!(job.is_finished());
}

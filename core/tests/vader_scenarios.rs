//! Sentence-level scoring scenarios with a small slice of the English
//! sentiment dictionary.

use std::sync::Arc;

use libsentiment_core::{Lexicon, Sentiment, SentimentScores};

fn analyzer() -> Sentiment {
    let dict = [
        ("good", 1.9f32),
        ("great", 3.1),
        ("smart", 1.7),
        ("handsome", 2.2),
        ("funny", 1.9),
        ("terrible", -2.1),
        ("bad", -2.5),
        ("shit", -2.6),
        ("love", 3.2),
        ("hate", -2.7),
        ("doubt", -1.5),
        ("no", -1.2),
    ];
    let emoji = [("\u{1f496}", "love"), ("\u{1f494}", "broken heart")];
    let lexicon = Lexicon::from_entries(
        dict.iter().map(|&(t, v)| (t.to_string(), v)),
        emoji.iter().map(|&(e, p)| (e.to_string(), p.to_string())),
    );
    Sentiment::new(Arc::new(lexicon))
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|w| w.to_string()).collect()
}

fn assert_closure(scores: &SentimentScores) {
    assert!((-1.0..=1.0).contains(&scores.compound));
    let sum = scores.positive + scores.neutral + scores.negative;
    assert!((sum - 1.0).abs() < 1e-3, "proportions sum to {sum}");
}

#[test]
fn empty_input_scores_zero() {
    let scores = analyzer().analyze(&[]);
    assert_eq!(scores, SentimentScores::default());
}

#[test]
fn positive_sentence_with_caps_differential() {
    let scores = analyzer().analyze(&words(&[
        "VADER", "is", "smart,", "handsome,", "and", "funny.",
    ]));
    assert!(scores.compound > 0.8, "compound = {}", scores.compound);
    assert!(scores.positive > scores.negative);
    assert!(scores.neutral > 0.0);
    assert_closure(&scores);
}

#[test]
fn negation_flips_the_valence() {
    let scores = analyzer().analyze(&words(&["The", "book", "was", "not", "good"]));
    assert!(scores.compound < -0.3, "compound = {}", scores.compound);
    assert_closure(&scores);
}

#[test]
fn all_caps_bump_increases_magnitude() {
    let plain = analyzer().analyze(&words(&["good"]));
    let shouted = analyzer().analyze(&words(&["GOOD", "zzz"]));
    assert!(
        shouted.compound > plain.compound,
        "{} vs {}",
        shouted.compound,
        plain.compound
    );
    assert_closure(&plain);
    assert_closure(&shouted);
}

#[test]
fn but_clause_shifts_the_weight() {
    let scores = analyzer().analyze(&words(&["good", "but", "terrible"]));
    // The left half is halved, the right half amplified by 1.5, so the
    // negative clause dominates.
    assert!(scores.compound < 0.0, "compound = {}", scores.compound);
    assert!(scores.negative > scores.positive);
    assert_closure(&scores);
}

#[test]
fn idiom_overrides_the_lexicon_valence() {
    // "the shit" is idiomatically positive; the override replaces the
    // strongly negative dictionary valence of "shit" once the idiom window
    // reaches it.
    let scores = analyzer().analyze(&words(&["it", "was", "just", "the", "shit"]));
    assert!(scores.compound > 0.5, "compound = {}", scores.compound);
    assert_closure(&scores);
}

#[test]
fn booster_strengthens_the_valence() {
    let plain = analyzer().analyze(&words(&["good"]));
    let boosted = analyzer().analyze(&words(&["really", "good"]));
    assert!(boosted.compound > plain.compound);
}

#[test]
fn dampener_weakens_the_valence() {
    let plain = analyzer().analyze(&words(&["good"]));
    let damped = analyzer().analyze(&words(&["slightly", "good"]));
    assert!(damped.compound < plain.compound);
    assert!(damped.compound > 0.0);
}

#[test]
fn emoji_tokens_expand_to_their_gloss() {
    let scores = analyzer().analyze(&words(&["\u{1f496}"]));
    assert!(scores.compound > 0.0, "compound = {}", scores.compound);
    // The gloss of a broken heart is neutral here unless the idiom window
    // reaches it, but the expansion must still produce two scoreable words.
    let broken = analyzer().analyze(&words(&["\u{1f494}"]));
    assert_closure(&broken);
}

#[test]
fn punctuation_is_trimmed_before_lookup() {
    let trimmed = analyzer().analyze(&words(&["good!!!"]));
    let plain = analyzer().analyze(&words(&["good"]));
    assert_eq!(trimmed.compound, plain.compound);
}

#[test]
fn never_so_amplifies() {
    // "never so good": the distance-2 sweep multiplies by the never-factor
    // instead of negating.
    let amplified = analyzer().analyze(&words(&["never", "so", "good"]));
    let negated = analyzer().analyze(&words(&["never", "good"]));
    assert!(amplified.compound > 0.0, "compound = {}", amplified.compound);
    assert!(negated.compound < 0.0, "compound = {}", negated.compound);
}

#[test]
fn score_closure_over_assorted_sentences() {
    let sentences: &[&[&str]] = &[
        &["I", "love", "it"],
        &["I", "hate", "it"],
        &["utterly", "terrible"],
        &["not", "bad"],
        &["plain", "words", "only"],
        &["no", "good"],
        &["at", "least", "good"],
    ];
    for sentence in sentences {
        let scores = analyzer().analyze(&words(sentence));
        assert_closure(&scores);
    }
}

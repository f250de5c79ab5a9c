//! Rule-based sentiment scoring (VADER).
//!
//! Implementation of the VADER algorithm:
//!
//! Hutto, C.J. & Gilbert, E.E. (2014). VADER: A Parsimonious Rule-based Model
//! for Sentiment Analysis of Social Media Text. Eighth International
//! Conference on Weblogs and Social Media (ICWSM-14).
//!
//! English only. The analyzer consumes one pre-tokenized sentence at a time;
//! punctuation-based emphasis is not scored because the upstream tokenizer
//! already strips punctuation. All arithmetic is single-precision and the
//! rule constants are frozen.

use std::sync::Arc;

use phf::{phf_map, phf_set};

use crate::lexicon::Lexicon;

/// Empirically derived rating increase for booster words.
const B_INCR: f32 = 0.293;

/// Empirically derived rating decrease for dampener words.
const B_DECR: f32 = -0.293;

/// Rating increase for a sentiment word in ALL CAPS when the rest of the
/// sentence is not.
const C_INCR: f32 = 0.733;

/// Negation factor.
const N_SCALAR: f32 = -0.74;

// Damping of booster words one and two positions removed from the item.
const DAMP_ONE: f32 = 0.95;
const DAMP_TWO: f32 = 0.90;

// Clause weighting around a contrastive "but".
const BUT_FACTOR_BEFORE: f32 = 0.5;
const BUT_FACTOR_AFTER: f32 = 1.5;

/// Factor applied after "never so" / "never this".
const NEVER_FACTOR: f32 = 1.25;

static NEGATE: phf::Set<&'static str> = phf_set! {
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt",
    "ain't", "aren't", "can't", "couldn't", "daren't", "didn't", "doesn't",
    "dont", "hadnt", "hasnt", "havent", "isnt", "mightnt", "mustnt", "neither",
    "don't", "hadn't", "hasn't", "haven't", "isn't", "mightn't", "mustn't",
    "neednt", "needn't", "never", "none", "nope", "nor", "not", "nothing",
    "nowhere", "oughtnt", "shant", "shouldnt", "uhuh", "wasnt", "werent",
    "oughtn't", "shan't", "shouldn't", "uh-uh", "wasn't", "weren't", "without",
    "wont", "wouldnt", "won't", "wouldn't", "rarely", "seldom", "despite",
};

// Booster/dampener 'intensifiers' or 'degree adverbs'.
// http://en.wiktionary.org/wiki/Category:English_degree_adverbs
static BOOSTER_DICT: phf::Map<&'static str, f32> = phf_map! {
    "absolutely" => B_INCR,
    "amazingly" => B_INCR,
    "awfully" => B_INCR,
    "completely" => B_INCR,
    "considerable" => B_INCR,
    "considerably" => B_INCR,
    "decidedly" => B_INCR,
    "deeply" => B_INCR,
    "effing" => B_INCR,
    "enormous" => B_INCR,
    "enormously" => B_INCR,
    "entirely" => B_INCR,
    "especially" => B_INCR,
    "exceptional" => B_INCR,
    "exceptionally" => B_INCR,
    "extreme" => B_INCR,
    "extremely" => B_INCR,
    "fabulously" => B_INCR,
    "flipping" => B_INCR,
    "flippin" => B_INCR,
    "frackin" => B_INCR,
    "fracking" => B_INCR,
    "fricking" => B_INCR,
    "frickin" => B_INCR,
    "frigging" => B_INCR,
    "friggin" => B_INCR,
    "fully" => B_INCR,
    "fuckin" => B_INCR,
    "fucking" => B_INCR,
    "fuggin" => B_INCR,
    "fugging" => B_INCR,
    "greatly" => B_INCR,
    "hella" => B_INCR,
    "highly" => B_INCR,
    "hugely" => B_INCR,
    "incredible" => B_INCR,
    "incredibly" => B_INCR,
    "intensely" => B_INCR,
    "major" => B_INCR,
    "majorly" => B_INCR,
    "more" => B_INCR,
    "most" => B_INCR,
    "particularly" => B_INCR,
    "purely" => B_INCR,
    "quite" => B_INCR,
    "really" => B_INCR,
    "remarkably" => B_INCR,
    "so" => B_INCR,
    "substantially" => B_INCR,
    "thoroughly" => B_INCR,
    "total" => B_INCR,
    "totally" => B_INCR,
    "tremendous" => B_INCR,
    "tremendously" => B_INCR,
    "uber" => B_INCR,
    "unbelievably" => B_INCR,
    "unusually" => B_INCR,
    "utter" => B_INCR,
    "utterly" => B_INCR,
    "very" => B_INCR,
    "almost" => B_DECR,
    "barely" => B_DECR,
    "hardly" => B_DECR,
    "just enough" => B_DECR,
    "kind of" => B_DECR,
    "kinda" => B_DECR,
    "kindof" => B_DECR,
    "kind-of" => B_DECR,
    "less" => B_DECR,
    "little" => B_DECR,
    "marginal" => B_DECR,
    "marginally" => B_DECR,
    "occasional" => B_DECR,
    "occasionally" => B_DECR,
    "partly" => B_DECR,
    "scarce" => B_DECR,
    "scarcely" => B_DECR,
    "slight" => B_DECR,
    "slightly" => B_DECR,
    "somewhat" => B_DECR,
    "sort of" => B_DECR,
    "sorta" => B_DECR,
    "sortof" => B_DECR,
    "sort-of" => B_DECR,
};

// Special case idioms and phrases containing lexicon words; the value is an
// absolute valence override.
static SPECIAL_CASES: phf::Map<&'static str, f32> = phf_map! {
    "the shit" => 3.0,
    "the bomb" => 3.0,
    "bad ass" => 1.5,
    "badass" => 1.5,
    "bus stop" => 0.0,
    "yeah right" => -2.0,
    "kiss of death" => -1.5,
    "to die for" => 3.0,
    "beating heart" => 3.1,
    "broken heart" => -2.9,
};

/// Sentiment scores of one sentence.
///
/// `positive`, `neutral` and `negative` are the proportions of text falling
/// in each category and sum to 1 up to floating error. `compound` is the
/// normalized weighted composite in `[-1, +1]` and is the most useful single
/// measure.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentScores {
    pub positive: f32,
    pub neutral: f32,
    pub negative: f32,
    pub compound: f32,
}

/// Sentence-level sentiment analyzer over a shared lexicon.
#[derive(Debug, Clone)]
pub struct Sentiment {
    lexicon: Arc<Lexicon>,
}

impl Sentiment {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Score the words of one sentence.
    ///
    /// An empty input yields all-zero scores.
    pub fn analyze(&self, words: &[String]) -> SentimentScores {
        let is_cap_difference = is_all_cap_differential(words);

        // Trim punctuation and expand emojis into their gloss words.
        let mut new_words: Vec<String> = Vec::with_capacity(words.len());
        for word in words {
            let trimmed = trim_token(word);
            match self.lexicon.emoji_phrase(trimmed) {
                Some(phrase) => new_words.extend(
                    phrase
                        .split(' ')
                        .filter(|piece| !piece.is_empty())
                        .map(str::to_string),
                ),
                None => new_words.push(trimmed.to_string()),
            }
        }

        let words_lower: Vec<String> = new_words
            .iter()
            .map(|w| w.to_ascii_lowercase())
            .collect();

        let mut sentiments: Vec<f32> = Vec::with_capacity(new_words.len());
        for index in 0..new_words.len() {
            if BOOSTER_DICT.contains_key(words_lower[index].as_str()) {
                sentiments.push(0.0);
                continue;
            }
            if index + 1 < new_words.len()
                && words_lower[index] == "kind"
                && words_lower[index + 1] == "of"
            {
                sentiments.push(0.0);
                continue;
            }
            self.sentiment_valence(
                &new_words,
                &words_lower,
                index,
                &mut sentiments,
                is_cap_difference,
            );
        }

        but_check(&words_lower, &mut sentiments);

        score_valence(&sentiments)
    }

    // Valence of the word at `index` after all contextual adjustments.
    fn sentiment_valence(
        &self,
        words: &[String],
        words_lower: &[String],
        index: usize,
        sentiments: &mut Vec<f32>,
        is_cap_difference: bool,
    ) {
        let mut valence = 0f32;

        if let Some(dict_valence) = self.lexicon.valence(&words_lower[index]) {
            valence = dict_valence;

            // "no" negating an adjacent lexicon item vs "no" as its own
            // stand-alone lexicon item: zero it here, the negation sweep
            // handles the effect on the next item.
            if words_lower[index] == "no"
                && index + 1 < words.len()
                && self.lexicon.contains(&words_lower[index + 1])
            {
                valence = 0.0;
            }

            if (index > 0 && words_lower[index - 1] == "no")
                || (index > 1 && words_lower[index - 2] == "no")
                || (index > 2
                    && words_lower[index - 3] == "no"
                    && (words_lower[index - 1] == "or" || words_lower[index - 1] == "nor"))
            {
                valence = dict_valence;
            }

            // Sentiment-laden word in ALL CAPS while others are not.
            if is_all_caps(&words[index]) && is_cap_difference {
                if valence > 0.0 {
                    valence += C_INCR;
                } else {
                    valence -= C_INCR;
                }
            }

            for start_index in 0..3 {
                // Dampen the scalar modifier of preceding words and emoticons
                // (excluding the ones that immediately precede the item)
                // based on their distance from the current item.
                if index > start_index {
                    let prec = &words[index - (start_index + 1)];
                    let prec_lower = &words_lower[index - (start_index + 1)];
                    if !self.lexicon.contains(prec_lower) {
                        let mut s =
                            scalar_inc_dec(prec, prec_lower, valence, is_cap_difference);
                        if s.abs() <= f32::EPSILON {
                            if start_index == 1 {
                                s *= DAMP_ONE;
                            } else if start_index == 2 {
                                s *= DAMP_TWO;
                            }
                        }
                        valence += s;
                        negation_check(&mut valence, words_lower, start_index, index);
                        if start_index == 2 {
                            special_idioms_check(&mut valence, words_lower, index);
                        }
                    }
                }
            }

            self.least_check(&mut valence, words_lower, index);
        }

        sentiments.push(valence);
    }

    // Negation by a preceding "least", unless part of "at least"/"very least".
    fn least_check(&self, valence: &mut f32, words_lower: &[String], index: usize) {
        if index > 1
            && !self.lexicon.contains(&words_lower[index - 1])
            && words_lower[index - 1] == "least"
        {
            if words_lower[index - 2] != "at" && words_lower[index - 2] != "very" {
                *valence *= N_SCALAR;
            }
        } else if index > 0
            && !self.lexicon.contains(&words_lower[index - 1])
            && words_lower[index - 1] == "least"
        {
            *valence *= N_SCALAR;
        }
    }
}

// Strip leading and trailing ASCII punctuation, control characters and
// spaces. May leave an empty token.
fn trim_token(word: &str) -> &str {
    let is_trimmed =
        |b: u8| b.is_ascii_punctuation() || b.is_ascii_control() || b == b' ';
    let bytes = word.as_bytes();
    let begin = bytes
        .iter()
        .position(|&b| !is_trimmed(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !is_trimmed(b))
        .map_or(begin, |p| p + 1);
    &word[begin..end.max(begin)]
}

fn is_negated(word_lower: &str) -> bool {
    NEGATE.contains(word_lower) || word_lower.contains("n't")
}

// Normalize the score to [-1, 1] with an alpha approximating the maximum
// expected value.
fn normalize(score: f32) -> f32 {
    const ALPHA: f32 = 15.0;
    (score / (score * score + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn is_all_caps(word: &str) -> bool {
    word.bytes().all(|b| b.is_ascii_uppercase())
}

// True when only some of the words are ALL CAPS (false if all or none are).
fn is_all_cap_differential(words: &[String]) -> bool {
    let all_cap_words = words.iter().filter(|w| is_all_caps(w)).count();
    all_cap_words > 0 && all_cap_words < words.len()
}

// Contribution of a preceding booster/dampener word to the valence.
fn scalar_inc_dec(word: &str, word_lower: &str, valence: f32, is_cap_diff: bool) -> f32 {
    let Some(&base) = BOOSTER_DICT.get(word_lower) else {
        return 0.0;
    };
    let mut scalar = base;
    if valence < 0.0 {
        scalar *= -1.0;
    }
    if is_all_caps(word) && is_cap_diff {
        if valence > 0.0 {
            scalar += C_INCR;
        } else {
            scalar -= C_INCR;
        }
    }
    scalar
}

// Negation of the item by words one to three positions back, with the
// "never so/this" amplification and the "without doubt" exemption.
fn negation_check(valence: &mut f32, words_lower: &[String], start_index: usize, index: usize) {
    match start_index {
        0 => {
            if is_negated(&words_lower[index - 1]) {
                // 1 word preceding the lexicon word (w/o stopwords)
                *valence *= N_SCALAR;
            }
        }
        1 => {
            if words_lower[index - 2] == "never"
                && (words_lower[index - 1] == "so" || words_lower[index - 1] == "this")
            {
                *valence *= NEVER_FACTOR;
            } else if words_lower[index - 2] == "without" && words_lower[index - 1] == "doubt" {
                // (ignore)
            } else if is_negated(&words_lower[index - 2]) {
                // 2 words preceding the lexicon word position
                *valence *= N_SCALAR;
            }
        }
        2 => {
            if words_lower[index - 3] == "never"
                && (words_lower[index - 2] == "so"
                    || words_lower[index - 2] == "this"
                    || words_lower[index - 1] == "so"
                    || words_lower[index - 1] == "this")
            {
                *valence *= NEVER_FACTOR;
            } else if words_lower[index - 3] == "without"
                && (words_lower[index - 2] == "doubt" || words_lower[index - 1] == "doubt")
            {
                // (ignore)
            } else if is_negated(&words_lower[index - 3]) {
                // 3 words preceding the lexicon word position
                *valence *= N_SCALAR;
            }
        }
        _ => {}
    }
}

// Idiom overrides on the 2- and 3-gram windows around the item, plus booster
// contributions of multi-word keys such as "sort of". Only reached once the
// item has at least three predecessors.
fn special_idioms_check(valence: &mut f32, words_lower: &[String], index: usize) {
    let one_zero = format!("{} {}", words_lower[index - 1], words_lower[index]);
    let two_one_zero = format!(
        "{} {} {}",
        words_lower[index - 2],
        words_lower[index - 1],
        words_lower[index]
    );
    let two_one = format!("{} {}", words_lower[index - 2], words_lower[index - 1]);
    let three_two_one = format!(
        "{} {} {}",
        words_lower[index - 3],
        words_lower[index - 2],
        words_lower[index - 1]
    );
    let three_two = format!("{} {}", words_lower[index - 3], words_lower[index - 2]);

    for sequence in [
        &one_zero,
        &two_one_zero,
        &two_one,
        &three_two_one,
        &three_two,
    ] {
        if let Some(&v) = SPECIAL_CASES.get(sequence.as_str()) {
            *valence = v;
            break;
        }
    }

    if words_lower.len() - 1 > index {
        let zero_one = format!("{} {}", words_lower[index], words_lower[index + 1]);
        if let Some(&v) = SPECIAL_CASES.get(zero_one.as_str()) {
            *valence = v;
        }
    }
    if words_lower.len() - 1 > index + 1 {
        let zero_one_two = format!(
            "{} {} {}",
            words_lower[index],
            words_lower[index + 1],
            words_lower[index + 2]
        );
        if let Some(&v) = SPECIAL_CASES.get(zero_one_two.as_str()) {
            *valence = v;
        }
    }

    // Booster/dampener bi-grams such as 'sort of' or 'kind of'.
    for n_gram in [&three_two_one, &three_two, &two_one] {
        if let Some(&b) = BOOSTER_DICT.get(n_gram.as_str()) {
            *valence += b;
        }
    }
}

// Clause weighting around the first contrastive "but".
fn but_check(words_lower: &[String], sentiments: &mut [f32]) {
    let Some(but_index) = words_lower.iter().position(|w| w == "but") else {
        return;
    };
    for (index, sentiment) in sentiments.iter_mut().enumerate() {
        if index < but_index {
            *sentiment *= BUT_FACTOR_BEFORE;
        } else if index > but_index {
            *sentiment *= BUT_FACTOR_AFTER;
        }
    }
}

// Partition the valences into positive sum, negative sum and neutral count,
// compensating each non-neutral item by one.
fn sift_sentiment_scores(sentiments: &[f32]) -> (f32, f32, usize) {
    let mut positive_sum = 0f32;
    let mut negative_sum = 0f32;
    let mut neutral_count = 0usize;
    for &sentiment in sentiments {
        if sentiment > f32::EPSILON {
            positive_sum += sentiment + 1.0;
        } else if sentiment < -f32::EPSILON {
            negative_sum += sentiment - 1.0;
        } else {
            neutral_count += 1;
        }
    }
    (positive_sum, negative_sum, neutral_count)
}

// Final scores from the adjusted valence list.
fn score_valence(sentiments: &[f32]) -> SentimentScores {
    if sentiments.is_empty() {
        return SentimentScores::default();
    }
    let sum: f32 = sentiments.iter().sum();
    let (positive_sum, negative_sum, neutral_count) = sift_sentiment_scores(sentiments);
    let total = positive_sum + negative_sum.abs() + neutral_count as f32;
    SentimentScores {
        positive: (positive_sum / total).abs(),
        negative: (negative_sum / total).abs(),
        neutral: (neutral_count as f32 / total).abs(),
        compound: normalize(sum),
    }
}

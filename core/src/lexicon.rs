//! Sentiment lexicon store.
//!
//! Loads the two tab-separated text files driving the analyzer:
//!
//! - the sentiment dictionary, `term<TAB>valence[<TAB>...]` per line, where
//!   fields after the valence are ignored
//! - the emoji map, `emoji<TAB>phrase` per line, where the phrase is a
//!   space-separated English gloss
//!
//! Lines without a tab are skipped silently. Both maps are read-only after
//! load and are shared across analysis jobs behind an `Arc`.

use std::path::Path;

use ahash::AHashMap;

use crate::error::AnalyzerError;

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    dict: AHashMap<String, f32>,
    emoji: AHashMap<String, String>,
}

impl Lexicon {
    /// Load the dictionary and emoji files. Failure to open or parse either
    /// file is fatal.
    pub fn load<P: AsRef<Path>>(dictionary_file: P, emoji_file: P) -> Result<Self, AnalyzerError> {
        let dictionary_file = dictionary_file.as_ref();
        let emoji_file = emoji_file.as_ref();
        let mut lexicon = Self::default();

        let dict_text = std::fs::read_to_string(dictionary_file)
            .map_err(|e| AnalyzerError::lexicon(dictionary_file, e))?;
        for line in dict_text.lines() {
            let Some((term, rest)) = line.split_once('\t') else {
                continue;
            };
            let value = rest.split('\t').next().unwrap_or(rest);
            let valence: f32 = value.trim().parse().map_err(|_| {
                AnalyzerError::LexiconUnavailable {
                    path: dictionary_file.to_path_buf(),
                    reason: format!("invalid valence for term '{term}'"),
                }
            })?;
            lexicon.dict.insert(term.to_string(), valence);
        }

        let emoji_text = std::fs::read_to_string(emoji_file)
            .map_err(|e| AnalyzerError::lexicon(emoji_file, e))?;
        for line in emoji_text.lines() {
            let Some((emoji, phrase)) = line.split_once('\t') else {
                continue;
            };
            lexicon.emoji.insert(emoji.to_string(), phrase.to_string());
        }

        Ok(lexicon)
    }

    /// Number of dictionary entries.
    pub fn dict_size(&self) -> usize {
        self.dict.len()
    }

    /// Number of entries in the emoji map.
    pub fn emoji_count(&self) -> usize {
        self.emoji.len()
    }

    pub(crate) fn valence(&self, term: &str) -> Option<f32> {
        self.dict.get(term).copied()
    }

    pub(crate) fn contains(&self, term: &str) -> bool {
        self.dict.contains_key(term)
    }

    pub(crate) fn emoji_phrase(&self, token: &str) -> Option<&str> {
        self.emoji.get(token).map(String::as_str)
    }

    /// Build a lexicon from in-memory entries. Mainly useful for tests and
    /// embedding callers that manage their own files.
    pub fn from_entries<I, J>(dict: I, emoji: J) -> Self
    where
        I: IntoIterator<Item = (String, f32)>,
        J: IntoIterator<Item = (String, String)>,
    {
        Self {
            dict: dict.into_iter().collect(),
            emoji: emoji.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_entries_and_skips_tabless_lines() {
        let mut dict = tempfile::NamedTempFile::new().unwrap();
        writeln!(dict, "good\t1.9\t0.9089").unwrap();
        writeln!(dict, "# a comment without tabs").unwrap();
        writeln!(dict, "terrible\t-2.1").unwrap();
        let mut emoji = tempfile::NamedTempFile::new().unwrap();
        writeln!(emoji, "\u{1f49e}\trevolving hearts").unwrap();
        writeln!(emoji, "no tab here").unwrap();

        let lexicon = Lexicon::load(dict.path(), emoji.path()).unwrap();
        assert_eq!(lexicon.dict_size(), 2);
        assert_eq!(lexicon.emoji_count(), 1);
        assert_eq!(lexicon.valence("good"), Some(1.9));
        assert_eq!(lexicon.valence("terrible"), Some(-2.1));
        assert_eq!(lexicon.emoji_phrase("\u{1f49e}"), Some("revolving hearts"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = Lexicon::load("/nonexistent/dict", "/nonexistent/emoji").unwrap_err();
        assert!(matches!(err, AnalyzerError::LexiconUnavailable { .. }));
    }

    #[test]
    fn malformed_valence_is_fatal() {
        let mut dict = tempfile::NamedTempFile::new().unwrap();
        writeln!(dict, "good\tnot-a-number").unwrap();
        let emoji = tempfile::NamedTempFile::new().unwrap();
        assert!(Lexicon::load(dict.path(), emoji.path()).is_err());
    }
}

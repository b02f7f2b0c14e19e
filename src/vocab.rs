//! Word frequency table, query word list and the per-word sampling
//! probabilities derived from them.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{ContextError, Result};

/// Corpus frequency per word, as written by the corpus preprocessing step.
pub type Frequencies = HashMap<String, u64>;

/// Reads `word count` lines. Blank lines are ignored.
pub fn read_frequencies<R: BufRead>(reader: R, path: &Path) -> Result<Frequencies> {
    let mut freqs = Frequencies::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(word) = fields.next() else {
            continue;
        };
        let count = fields
            .next()
            .ok_or_else(|| ContextError::invalid_format(path, i + 1, "missing count"))?;
        let count = count.parse::<u64>().map_err(|e| {
            ContextError::invalid_format(path, i + 1, format!("bad count {count:?}: {e}"))
        })?;
        freqs.insert(word.to_string(), count);
    }
    Ok(freqs)
}

pub fn load_frequencies(path: &Path) -> Result<Frequencies> {
    read_frequencies(BufReader::new(File::open(path)?), path)
}

/// First field of every non-blank line, duplicates dropped, order kept.
pub fn read_query_words<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut words = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(word) = line.split_whitespace().next() {
            if seen.insert(word.to_string()) {
                words.push(word.to_string());
            }
        }
    }
    Ok(words)
}

pub fn load_query_words(path: &Path) -> Result<Vec<String>> {
    read_query_words(BufReader::new(File::open(path)?))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    NotInVocabulary,
    ZeroFrequency,
    UnknownToTokenizer,
    EmptyTokenization,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Skipped {
    pub word: String,
    pub reason: SkipReason,
}

/// Sampling probability per query word, in insertion order.
///
/// Values above 1 mean the word is always kept.
#[derive(Clone, Debug, Default)]
pub struct SampleProbs {
    entries: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl SampleProbs {
    /// Later pairs for the same word replace the probability in place.
    pub fn from_pairs<I: IntoIterator<Item = (String, f64)>>(pairs: I) -> Self {
        let mut probs = SampleProbs::default();
        for (word, p) in pairs {
            match probs.index.get(&word) {
                Some(&i) => probs.entries[i].1 = p,
                None => {
                    probs.index.insert(word.clone(), probs.entries.len());
                    probs.entries.push((word, p));
                }
            }
        }
        probs
    }

    /// `target / frequency` for every query word with a known, non-zero
    /// frequency. Everything else is returned as skipped.
    pub fn from_frequencies(
        query_words: &[String],
        freqs: &Frequencies,
        target: u64,
    ) -> (Self, Vec<Skipped>) {
        let mut skipped = Vec::new();
        let mut pairs = Vec::with_capacity(query_words.len());
        for word in query_words {
            match freqs.get(word) {
                None => {
                    debug!(word = %word, "query word not in frequency table");
                    skipped.push(Skipped {
                        word: word.clone(),
                        reason: SkipReason::NotInVocabulary,
                    });
                }
                Some(&0) => {
                    debug!(word = %word, "query word has zero frequency");
                    skipped.push(Skipped {
                        word: word.clone(),
                        reason: SkipReason::ZeroFrequency,
                    });
                }
                Some(&freq) => pairs.push((word.clone(), target as f64 / freq as f64)),
            }
        }
        (Self::from_pairs(pairs), skipped)
    }

    pub fn get(&self, word: &str) -> Option<f64> {
        self.index.get(word).map(|&i| self.entries[i].1)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(w, _)| w.as_str())
    }

    /// Keeps the words for which `keep` returns true.
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.entries.retain(|(w, _)| keep(w));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (w, _))| (w.clone(), i))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("vocab.txt")
    }

    #[test]
    fn frequencies_parse_word_count_lines() {
        let f = read_frequencies("der 1000\n\nHaus 40\nWahrheit  8\n".as_bytes(), path()).unwrap();
        assert_eq!(f.len(), 3);
        assert_eq!(f["Wahrheit"], 8);
    }

    #[test]
    fn malformed_frequency_line_reports_position() {
        let err = read_frequencies("der 1000\nHaus\n".as_bytes(), path()).unwrap_err();
        assert_eq!(err.to_string(), "vocab.txt:2: missing count");
        let err = read_frequencies("Haus viele\n".as_bytes(), path()).unwrap_err();
        assert!(matches!(err, ContextError::InvalidFormat { line: 1, .. }));
    }

    #[test]
    fn query_words_take_first_field_once() {
        let words = read_query_words("Haus 3\nWahrheit\n\nHaus x\n".as_bytes()).unwrap();
        assert_eq!(words, vec!["Haus".to_string(), "Wahrheit".to_string()]);
    }

    #[test]
    fn probabilities_from_frequencies() {
        let freqs: Frequencies = [("Haus", 400u64), ("selten", 50), ("nie", 0)]
            .into_iter()
            .map(|(w, c)| (w.to_string(), c))
            .collect();
        let query: Vec<String> = ["Haus", "selten", "nie", "fehlt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (probs, skipped) = SampleProbs::from_frequencies(&query, &freqs, 100);
        assert_eq!(probs.get("Haus"), Some(0.25));
        assert_eq!(probs.get("selten"), Some(2.0));
        assert_eq!(probs.words().collect::<Vec<_>>(), vec!["Haus", "selten"]);
        assert_eq!(
            skipped.iter().map(|s| s.reason).collect::<Vec<_>>(),
            vec![SkipReason::ZeroFrequency, SkipReason::NotInVocabulary]
        );
    }

    #[test]
    fn retain_reindexes() {
        let mut probs = SampleProbs::from_pairs(
            [("a", 0.1), ("b", 0.2), ("c", 0.3)].map(|(w, p)| (w.to_string(), p)),
        );
        probs.retain(|w| w != "a");
        assert_eq!(probs.get("a"), None);
        assert_eq!(probs.get("c"), Some(0.3));
        assert_eq!(probs.len(), 2);
    }
}

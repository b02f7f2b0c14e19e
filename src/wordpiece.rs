//! WordPiece tokenization of single words against a BERT vocabulary.
//!
//! Only the word-level step is implemented: the corpus arrives already split
//! into pieces, and query words are single words.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use crate::error::{ContextError, Result};
use crate::piece::{PieceClassifier, DEFAULT_MARKER};

pub const DEFAULT_UNK: &str = "[UNK]";
pub const DEFAULT_MAX_INPUT_CHARS: usize = 100;

/// Turns one word into its ordered sequence of subword pieces.
pub trait WordTokenizer {
    fn tokenize_word(&self, word: &str) -> Vec<String>;
}

impl<F> WordTokenizer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn tokenize_word(&self, word: &str) -> Vec<String> {
        self(word)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Normalization {
    #[default]
    None,
    Nfc,
}

#[derive(Debug, Clone)]
pub struct WordPiece {
    vocab: HashSet<String>,
    marker: String,
    unk_token: String,
    max_input_chars: usize,
    normalization: Normalization,
}

#[derive(Deserialize)]
struct TokenizerJson {
    model: ModelJson,
}

#[derive(Deserialize)]
struct ModelJson {
    vocab: HashMap<String, u32>,
    #[serde(default)]
    unk_token: Option<String>,
    #[serde(default)]
    continuing_subword_prefix: Option<String>,
    #[serde(default)]
    max_input_chars_per_word: Option<usize>,
}

impl WordPiece {
    pub fn new<I, S>(vocab: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WordPiece {
            vocab: vocab.into_iter().map(Into::into).collect(),
            marker: DEFAULT_MARKER.to_string(),
            unk_token: DEFAULT_UNK.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            normalization: Normalization::None,
        }
    }

    /// Loads `tokenizer.json` (by extension) or a plain `vocab.txt`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let text = fs::read_to_string(path)?;
        if is_json {
            Self::from_tokenizer_json(&text)
        } else {
            Ok(Self::from_vocab_txt(&text))
        }
    }

    /// One piece per line, as shipped with BERT checkpoints.
    pub fn from_vocab_txt(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(|l| l.trim_end_matches('\r'))
                .filter(|l| !l.is_empty()),
        )
    }

    pub fn from_tokenizer_json(text: &str) -> Result<Self> {
        let parsed: TokenizerJson = serde_json::from_str(text)?;
        let model = parsed.model;
        if model.vocab.is_empty() {
            return Err(ContextError::InvalidArgument(
                "tokenizer.json has an empty vocabulary".to_string(),
            ));
        }
        let mut wp = Self::new(model.vocab.into_keys());
        if let Some(unk) = model.unk_token {
            wp.unk_token = unk;
        }
        if let Some(prefix) = model.continuing_subword_prefix {
            wp.marker = prefix;
        }
        if let Some(max) = model.max_input_chars_per_word {
            wp.max_input_chars = max;
        }
        Ok(wp)
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_unk_token(mut self, unk: impl Into<String>) -> Self {
        self.unk_token = unk.into();
        self
    }

    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn unk_token(&self) -> &str {
        &self.unk_token
    }

    pub fn vocab_len(&self) -> usize {
        self.vocab.len()
    }

    /// Classifier derived from this vocabulary and marker.
    pub fn classifier(&self) -> PieceClassifier {
        PieceClassifier::from_vocab(self.vocab.iter(), &self.marker)
    }

    /// True if the word came out as the unknown token alone.
    pub fn is_unknown(&self, pieces: &[String]) -> bool {
        matches!(pieces, [only] if *only == self.unk_token)
    }

    fn split(&self, word: &str) -> Vec<String> {
        let mut bounds: Vec<usize> = word.char_indices().map(|(i, _)| i).collect();
        let n_chars = bounds.len();
        if n_chars == 0 {
            return Vec::new();
        }
        if n_chars > self.max_input_chars {
            return vec![self.unk_token.clone()];
        }
        bounds.push(word.len());

        let mut pieces = Vec::new();
        let mut candidate = String::with_capacity(word.len() + self.marker.len());
        let mut begin = 0;
        while begin < n_chars {
            let mut end = n_chars;
            let mut found = false;
            while begin < end {
                candidate.clear();
                if begin > 0 {
                    candidate.push_str(&self.marker);
                }
                candidate.push_str(&word[bounds[begin]..bounds[end]]);
                if self.vocab.contains(&candidate) {
                    found = true;
                    break;
                }
                end -= 1;
            }
            if !found {
                return vec![self.unk_token.clone()];
            }
            pieces.push(candidate.clone());
            begin = end;
        }
        pieces
    }
}

impl WordTokenizer for WordPiece {
    fn tokenize_word(&self, word: &str) -> Vec<String> {
        match self.normalization {
            Normalization::None => self.split(word),
            Normalization::Nfc => {
                let normalized: String = word.nfc().collect();
                self.split(&normalized)
            }
        }
    }
}

//! Decides whether a subword piece continues the previous word.
//!
//! The set is fixed at construction: every piece of the tokenizer vocabulary
//! that carries the continuation marker. It has to agree with whatever
//! tokenizer produced the corpus, otherwise matching silently under-reports.

use std::collections::HashSet;

pub const DEFAULT_MARKER: &str = "##";

#[derive(Debug, Clone, Default)]
pub struct PieceClassifier {
    continuations: HashSet<String>,
}

impl PieceClassifier {
    /// Collects every marked piece from a full subword vocabulary.
    pub fn from_vocab<I, S>(vocab: I, marker: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let continuations = vocab
            .into_iter()
            .filter(|p| p.as_ref().starts_with(marker))
            .map(|p| p.as_ref().to_string())
            .collect();
        PieceClassifier { continuations }
    }

    #[inline]
    pub fn is_continuation(&self, piece: &str) -> bool {
        self.continuations.contains(piece)
    }

    pub fn len(&self) -> usize {
        self.continuations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.continuations.is_empty()
    }
}

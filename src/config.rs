use std::path::PathBuf;

use crate::corpus::DEFAULT_MAX_LINE_PIECES;
use crate::error::{ContextError, Result};
use crate::piece::DEFAULT_MARKER;
use crate::wordpiece::{Normalization, DEFAULT_MAX_INPUT_CHARS, DEFAULT_UNK};

pub const DEFAULT_TARGET_COUNT: u64 = 100;
pub const DEFAULT_SEED: u64 = 15452;
pub const DEFAULT_SHARD_LINES: usize = 10_000;

/// Tuning knobs of one sampling run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Approximate number of contexts wanted per query word.
    pub target_count: u64,
    pub seed: u64,
    pub max_line_pieces: usize,
    /// Overrides the marker of the tokenizer vocabulary when set.
    pub continuation_marker: Option<String>,
    /// Overrides the unknown token of the tokenizer vocabulary when set.
    pub unk_token: Option<String>,
    pub max_input_chars_per_word: Option<usize>,
    pub normalization: Normalization,
    pub jobs: usize,
    pub shard_lines: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            target_count: DEFAULT_TARGET_COUNT,
            seed: DEFAULT_SEED,
            max_line_pieces: DEFAULT_MAX_LINE_PIECES,
            continuation_marker: None,
            unk_token: None,
            max_input_chars_per_word: None,
            normalization: Normalization::None,
            jobs: 1,
            shard_lines: DEFAULT_SHARD_LINES,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(ContextError::InvalidArgument(msg.to_string()));
        if self.target_count == 0 {
            return bad("target count must be positive");
        }
        if self.max_line_pieces == 0 {
            return bad("maximum line length must be positive");
        }
        if self.jobs == 0 {
            return bad("number of jobs must be positive");
        }
        if self.shard_lines == 0 {
            return bad("shard size must be positive");
        }
        if matches!(self.continuation_marker.as_deref(), Some("")) {
            return bad("continuation marker must not be empty");
        }
        if matches!(self.unk_token.as_deref(), Some("")) {
            return bad("unknown token must not be empty");
        }
        Ok(())
    }

    /// Marker in effect for a plain vocab.txt, which carries none of its own.
    pub fn marker_or_default(&self) -> &str {
        self.continuation_marker.as_deref().unwrap_or(DEFAULT_MARKER)
    }

    pub fn unk_or_default(&self) -> &str {
        self.unk_token.as_deref().unwrap_or(DEFAULT_UNK)
    }

    pub fn max_input_chars_or_default(&self) -> usize {
        self.max_input_chars_per_word
            .unwrap_or(DEFAULT_MAX_INPUT_CHARS)
    }
}

/// Files a run reads and writes.
#[derive(Clone, Debug, Default)]
pub struct RunInputs {
    pub query_words: PathBuf,
    /// `word count` frequency table of the corpus.
    pub frequencies: PathBuf,
    /// `vocab.txt` or `tokenizer.json` of the wordpiece model.
    pub tokenizer: PathBuf,
    pub corpus: PathBuf,
    /// Standard output when unset.
    pub output: Option<PathBuf>,
    pub save_trie: Option<PathBuf>,
}

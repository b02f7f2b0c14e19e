//! Samples usage contexts of query words from a wordpiece-tokenized corpus.
//!
//! Query words are tokenized once into a [`trie::QueryTrie`]. Each corpus
//! line is scanned left to right by [`scanner::scan`], and every match is kept
//! with the word's sampling probability by [`sampler::ContextSampler`].

pub mod config;
pub mod corpus;
pub mod error;
pub mod output;
pub mod piece;
pub mod run;
pub mod sampler;
pub mod scanner;
pub mod shard;
pub mod trie;
pub mod vocab;
pub mod wordpiece;

pub use error::{ContextError, Result};
pub use piece::PieceClassifier;
pub use sampler::{Context, ContextSampler};
pub use scanner::{scan, Match};
pub use trie::QueryTrie;
pub use vocab::SampleProbs;
pub use wordpiece::{WordPiece, WordTokenizer};

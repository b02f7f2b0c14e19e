//! Prefix tree over the wordpiece sequences of the query words.
//!
//! Nodes live in a flat arena and refer to their children by index. Node 0 is
//! the root. The trie is built once and never mutated while scanning, so it
//! can be shared across threads by reference.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, Result};
use crate::wordpiece::WordTokenizer;

pub type NodeId = u32;
pub type WordId = u32;

pub const ROOT: NodeId = 0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Node {
    children: HashMap<String, NodeId>,
    word: Option<WordId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTrie {
    nodes: Vec<Node>,
    words: Vec<String>,
}

impl Default for QueryTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryTrie {
    pub fn new() -> Self {
        QueryTrie {
            nodes: vec![Node::default()],
            words: Vec::new(),
        }
    }

    /// Tokenizes every query word once and inserts it.
    ///
    /// Fails on the first word with an empty tokenization. Words sharing a
    /// tokenization resolve last-wins.
    pub fn build<I, S, T>(query_words: I, tokenizer: &T) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: WordTokenizer + ?Sized,
    {
        let mut trie = QueryTrie::new();
        for word in query_words {
            let word = word.as_ref();
            let pieces = tokenizer.tokenize_word(word);
            trie.insert(word, &pieces)?;
        }
        Ok(trie)
    }

    /// Inserts `word` under the given piece path and returns its id.
    ///
    /// A word already terminating at the same node is silently replaced.
    pub fn insert<S: AsRef<str>>(&mut self, word: &str, pieces: &[S]) -> Result<WordId> {
        if pieces.is_empty() {
            return Err(ContextError::EmptyTokenization {
                word: word.to_string(),
            });
        }
        let mut cur = ROOT;
        for piece in pieces {
            let piece = piece.as_ref();
            cur = match self.nodes[cur as usize].children.get(piece) {
                Some(&idx) => idx,
                None => {
                    let idx = next_id(self.nodes.len(), "trie nodes")?;
                    self.nodes.push(Node::default());
                    self.nodes[cur as usize]
                        .children
                        .insert(piece.to_string(), idx);
                    idx
                }
            };
        }
        let id = next_id(self.words.len(), "query words")?;
        self.words.push(word.to_string());
        self.nodes[cur as usize].word = Some(id);
        Ok(id)
    }

    #[inline]
    pub fn child(&self, node: NodeId, piece: &str) -> Option<NodeId> {
        self.nodes[node as usize].children.get(piece).copied()
    }

    /// Word terminating exactly at `node`, if any.
    #[inline]
    pub fn payload(&self, node: NodeId) -> Option<WordId> {
        self.nodes[node as usize].word
    }

    pub fn word(&self, id: WordId) -> &str {
        &self.words[id as usize]
    }

    /// All inserted words by id, including ones shadowed by a later collision.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Ids of the words that are still reachable after last-wins overwrites.
    pub fn reachable_words(&self) -> impl Iterator<Item = WordId> + '_ {
        self.nodes.iter().filter_map(|n| n.word)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Loads a trie written by [`QueryTrie::to_writer`].
    ///
    /// Rejects a missing or terminal root and any child or word id that is
    /// out of range.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let trie: QueryTrie = serde_json::from_reader(reader)?;
        trie.validate()?;
        Ok(trie)
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() || self.nodes[ROOT as usize].word.is_some() {
            return Err(ContextError::InvalidArgument(
                "serialized trie has no root or a terminal root".to_string(),
            ));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some((piece, &child)) = node
                .children
                .iter()
                .find(|(_, child)| **child as usize >= self.nodes.len())
            {
                return Err(ContextError::InvalidArgument(format!(
                    "node {i} has child {child} for {piece:?} but the trie has {} nodes",
                    self.nodes.len()
                )));
            }
            if let Some(word) = node.word.filter(|&w| w as usize >= self.words.len()) {
                return Err(ContextError::InvalidArgument(format!(
                    "node {i} ends word {word} but the trie has {} words",
                    self.words.len()
                )));
            }
        }
        Ok(())
    }
}

/// Id for the element about to be pushed onto an arena of length `len`.
fn next_id(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        ContextError::InvalidArgument(format!("too many {what} for 32-bit ids"))
    })
}

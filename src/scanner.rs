//! Streaming matcher for query words in one pretokenized line.
//!
//! One left-to-right pass, at most one candidate run at a time. A run starts
//! at a word-initial piece, is extended by continuation pieces, and is
//! reported when the next word-initial piece (or the end of the line) closes
//! it on a terminal node.
//!
//! A continuation piece that does not extend the active run drops the run and
//! is not retried as a fresh start. A query word whose first piece is a
//! continuation piece elsewhere in the vocabulary is therefore never found.

use crate::piece::PieceClassifier;
use crate::trie::{NodeId, QueryTrie, WordId, ROOT};

/// The view of the trie the scanner needs.
pub trait Automaton {
    fn child(&self, node: NodeId, piece: &str) -> Option<NodeId>;
    fn payload(&self, node: NodeId) -> Option<WordId>;
}

impl Automaton for QueryTrie {
    #[inline]
    fn child(&self, node: NodeId, piece: &str) -> Option<NodeId> {
        QueryTrie::child(self, node, piece)
    }

    #[inline]
    fn payload(&self, node: NodeId) -> Option<WordId> {
        QueryTrie::payload(self, node)
    }
}

/// One recognized occurrence, in piece offsets of the current line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Match {
    pub word: WordId,
    pub start: usize,
    pub len: usize,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RunState {
    #[default]
    AtRoot,
    InRun {
        node: NodeId,
        start: usize,
        len: usize,
    },
}

impl RunState {
    /// Consumes the piece at `index` and returns the next state and the
    /// match it closed, if any.
    pub fn on_piece<A: Automaton + ?Sized>(
        self,
        trie: &A,
        index: usize,
        piece: &str,
        is_continuation: bool,
    ) -> (RunState, Option<Match>) {
        if is_continuation {
            let next = match self {
                RunState::InRun { node, start, len } => match trie.child(node, piece) {
                    Some(child) => RunState::InRun {
                        node: child,
                        start,
                        len: len + 1,
                    },
                    None => RunState::AtRoot,
                },
                RunState::AtRoot => RunState::AtRoot,
            };
            return (next, None);
        }

        let closed = self.finish(trie);
        let next = match trie.child(ROOT, piece) {
            Some(child) => RunState::InRun {
                node: child,
                start: index,
                len: 1,
            },
            None => RunState::AtRoot,
        };
        (next, closed)
    }

    /// The match for the run, if the run ends exactly on a query word.
    pub fn finish<A: Automaton + ?Sized>(self, trie: &A) -> Option<Match> {
        match self {
            RunState::InRun { node, start, len } => trie
                .payload(node)
                .map(|word| Match { word, start, len }),
            RunState::AtRoot => None,
        }
    }
}

/// Lazy sequence of matches in one line. Holds no state beyond the line.
pub struct Scanner<'a, S> {
    trie: &'a QueryTrie,
    classifier: &'a PieceClassifier,
    line: &'a [S],
    pos: usize,
    state: RunState,
    done: bool,
}

impl<'a, S: AsRef<str>> Scanner<'a, S> {
    pub fn new(trie: &'a QueryTrie, classifier: &'a PieceClassifier, line: &'a [S]) -> Self {
        Scanner {
            trie,
            classifier,
            line,
            pos: 0,
            state: RunState::AtRoot,
            done: false,
        }
    }
}

impl<S: AsRef<str>> Iterator for Scanner<'_, S> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        while self.pos < self.line.len() {
            let index = self.pos;
            self.pos += 1;
            let piece = self.line[index].as_ref();
            let cont = self.classifier.is_continuation(piece);
            let (next, closed) = self.state.on_piece(self.trie, index, piece, cont);
            self.state = next;
            if closed.is_some() {
                return closed;
            }
        }
        if self.done {
            return None;
        }
        self.done = true;
        std::mem::take(&mut self.state).finish(self.trie)
    }
}

pub fn scan<'a, S: AsRef<str>>(
    trie: &'a QueryTrie,
    classifier: &'a PieceClassifier,
    line: &'a [S],
) -> Scanner<'a, S> {
    Scanner::new(trie, classifier, line)
}

//! Turns scanner matches into sampled context records.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::Rng;

use crate::piece::PieceClassifier;
use crate::scanner::scan;
use crate::trie::{QueryTrie, WordId};
use crate::vocab::SampleProbs;

/// An accepted occurrence together with the line it was found in.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    pub word: WordId,
    /// 1-based number of this record among the records of the same word.
    pub counter: u64,
    pub line: Arc<[String]>,
    pub start: usize,
    pub len: usize,
}

/// Emitted records per word id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleCounts(Vec<u64>);

impl SampleCounts {
    pub fn new(words: usize) -> Self {
        SampleCounts(vec![0; words])
    }

    /// Increments and returns the new count.
    pub fn bump(&mut self, word: WordId) -> u64 {
        let slot = &mut self.0[word as usize];
        *slot += 1;
        *slot
    }

    pub fn get(&self, word: WordId) -> u64 {
        self.0.get(word as usize).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &SampleCounts) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a += b;
        }
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WordId, u64)> + '_ {
        self.0.iter().enumerate().map(|(i, &c)| (i as WordId, c))
    }
}

pub struct ContextSampler<'a, R> {
    trie: &'a QueryTrie,
    classifier: &'a PieceClassifier,
    probs: Vec<f64>,
    counts: SampleCounts,
    matches: u64,
    rng: R,
}

impl<'a, R: Rng> ContextSampler<'a, R> {
    /// Words of the trie without a probability are never accepted.
    pub fn new(
        trie: &'a QueryTrie,
        classifier: &'a PieceClassifier,
        probs: &SampleProbs,
        rng: R,
    ) -> Self {
        let probs = trie
            .words()
            .iter()
            .map(|w| probs.get(w).unwrap_or(0.0))
            .collect();
        ContextSampler {
            trie,
            classifier,
            probs,
            counts: SampleCounts::new(trie.words().len()),
            matches: 0,
            rng,
        }
    }

    /// Scans one line and appends the accepted records to `out`.
    pub fn sample_line(&mut self, line: Arc<[String]>, out: &mut Vec<Context>) {
        for m in scan(self.trie, self.classifier, &line[..]) {
            self.matches += 1;
            let draw: f64 = self.rng.gen();
            if draw >= self.probs[m.word as usize] {
                continue;
            }
            let counter = self.counts.bump(m.word);
            out.push(Context {
                word: m.word,
                counter,
                line: Arc::clone(&line),
                start: m.start,
                len: m.len,
            });
        }
    }

    /// Lazy record stream over a sequence of lines.
    pub fn contexts<I>(&mut self, lines: I) -> Contexts<'_, 'a, I::IntoIter, R>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        Contexts {
            sampler: self,
            lines: lines.into_iter(),
            pending: VecDeque::new(),
            buf: Vec::new(),
        }
    }

    pub fn counts(&self) -> &SampleCounts {
        &self.counts
    }

    pub fn into_counts(self) -> SampleCounts {
        self.counts
    }

    /// Matches seen so far, accepted or not.
    pub fn matches(&self) -> u64 {
        self.matches
    }
}

pub struct Contexts<'s, 'a, I, R> {
    sampler: &'s mut ContextSampler<'a, R>,
    lines: I,
    pending: VecDeque<Context>,
    buf: Vec<Context>,
}

impl<I, R> Iterator for Contexts<'_, '_, I, R>
where
    I: Iterator<Item = Vec<String>>,
    R: Rng,
{
    type Item = Context;

    fn next(&mut self) -> Option<Context> {
        loop {
            if let Some(ctx) = self.pending.pop_front() {
                return Some(ctx);
            }
            let line = self.lines.next()?;
            self.sampler.sample_line(line.into(), &mut self.buf);
            self.pending.extend(self.buf.drain(..));
        }
    }
}

//! Parallel sampling over independent corpus shards.
//!
//! Every shard gets its own sampler, its own count map and its own random
//! stream (the run seed with the shard index as ChaCha stream id), so the
//! accepted set depends only on the seed and the shard layout, never on the
//! number of threads. Counters are renumbered when shards are merged back in
//! order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::piece::PieceClassifier;
use crate::sampler::{Context, ContextSampler, SampleCounts};
use crate::trie::QueryTrie;
use crate::vocab::SampleProbs;

/// Random source of one shard.
pub fn shard_rng(seed: u64, shard: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(shard);
    rng
}

#[derive(Debug)]
pub struct ShardOutput {
    pub index: u64,
    /// Counters are local to the shard until passed through [`ShardMerger`].
    pub contexts: Vec<Context>,
    pub counts: SampleCounts,
    pub matches: u64,
}

pub fn sample_shard(
    trie: &QueryTrie,
    classifier: &PieceClassifier,
    probs: &SampleProbs,
    seed: u64,
    index: u64,
    lines: Vec<Vec<String>>,
) -> ShardOutput {
    let mut sampler = ContextSampler::new(trie, classifier, probs, shard_rng(seed, index));
    let contexts: Vec<Context> = sampler.contexts(lines).collect();
    let matches = sampler.matches();
    ShardOutput {
        index,
        contexts,
        counts: sampler.into_counts(),
        matches,
    }
}

/// Samples consecutive shards on the current rayon pool, numbered from
/// `first_index`. Results come back in shard order.
pub fn sample_shards(
    trie: &QueryTrie,
    classifier: &PieceClassifier,
    probs: &SampleProbs,
    seed: u64,
    first_index: u64,
    shards: Vec<Vec<Vec<String>>>,
) -> Vec<ShardOutput> {
    shards
        .into_par_iter()
        .enumerate()
        .map(|(i, lines)| sample_shard(trie, classifier, probs, seed, first_index + i as u64, lines))
        .collect()
}

/// Folds shard outputs, in shard order, into run-wide counters.
#[derive(Debug, Default)]
pub struct ShardMerger {
    counts: SampleCounts,
    matches: u64,
}

impl ShardMerger {
    pub fn new(words: usize) -> Self {
        ShardMerger {
            counts: SampleCounts::new(words),
            matches: 0,
        }
    }

    /// Rewrites the shard-local counters to run-wide ones.
    pub fn merge(&mut self, shard: &mut ShardOutput) {
        for ctx in &mut shard.contexts {
            ctx.counter += self.counts.get(ctx.word);
        }
        self.counts.merge(&shard.counts);
        self.matches += shard.matches;
    }

    pub fn counts(&self) -> &SampleCounts {
        &self.counts
    }

    pub fn matches(&self) -> u64 {
        self.matches
    }

    pub fn into_counts(self) -> SampleCounts {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (QueryTrie, PieceClassifier, SampleProbs) {
        let probs = SampleProbs::from_pairs([("ist".to_string(), 0.5), ("Haus".to_string(), 1.0)]);
        let trie = QueryTrie::build(probs.words(), &|w: &str| vec![w.to_string()]).unwrap();
        (trie, PieceClassifier::default(), probs)
    }

    fn corpus(n: usize) -> Vec<Vec<String>> {
        (0..n)
            .map(|i| {
                let w = if i % 2 == 0 { "Haus" } else { "ist" };
                vec!["das".to_string(), w.to_string(), "ist".to_string()]
            })
            .collect()
    }

    fn run_with_threads(threads: usize) -> (Vec<Context>, SampleCounts) {
        let (trie, c, probs) = setup();
        let shards: Vec<Vec<Vec<String>>> = corpus(100).chunks(7).map(|chunk| chunk.to_vec()).collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        let outputs = pool.install(|| sample_shards(&trie, &c, &probs, 42, 0, shards));
        let mut merger = ShardMerger::new(trie.words().len());
        let mut all = Vec::new();
        for mut out in outputs {
            merger.merge(&mut out);
            all.extend(out.contexts);
        }
        (all, merger.into_counts())
    }

    #[test]
    fn output_does_not_depend_on_thread_count() {
        let (a, ca) = run_with_threads(1);
        let (b, cb) = run_with_threads(4);
        assert_eq!(a, b);
        assert_eq!(ca, cb);
    }

    #[test]
    fn merged_counters_run_consecutively_per_word() {
        let (trie, _, _) = setup();
        let (all, counts) = run_with_threads(3);
        for (word, total) in counts.iter() {
            let seen: Vec<u64> = all.iter().filter(|c| c.word == word).map(|c| c.counter).collect();
            assert_eq!(seen, (1..=total).collect::<Vec<_>>(), "{}", trie.word(word));
        }
        // "Haus" has probability 1 and occurs in every other line
        let haus = trie.words().iter().position(|w| w == "Haus").unwrap() as u32;
        assert_eq!(counts.get(haus), 50);
    }

    #[test]
    fn shard_streams_differ() {
        use rand::RngCore;
        assert_ne!(shard_rng(1, 0).next_u64(), shard_rng(1, 1).next_u64());
        assert_eq!(shard_rng(1, 5).next_u64(), shard_rng(1, 5).next_u64());
    }
}

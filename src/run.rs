//! End-to-end sampling run: load inputs, build the trie, scan the corpus,
//! write records.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::{RunConfig, RunInputs};
use crate::corpus::CorpusReader;
use crate::error::{ContextError, Result};
use crate::output::ContextWriter;
use crate::piece::PieceClassifier;
use crate::sampler::{ContextSampler, SampleCounts};
use crate::shard::{sample_shards, ShardMerger};
use crate::trie::QueryTrie;
use crate::vocab::{self, SampleProbs, SkipReason, Skipped};
use crate::wordpiece::{WordPiece, WordTokenizer};

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub lines_read: u64,
    pub lines_rejected: u64,
    pub matches: u64,
    pub records: u64,
    /// Final record count per query word in trie order, zeros included.
    pub counts: Vec<(String, u64)>,
}

impl RunSummary {
    pub fn zero_count_words(&self) -> impl Iterator<Item = &str> + '_ {
        self.counts
            .iter()
            .filter(|(_, c)| *c == 0)
            .map(|(w, _)| w.as_str())
    }
}

/// Applies the configured overrides to a loaded tokenizer.
pub fn configure_tokenizer(mut wp: WordPiece, config: &RunConfig) -> WordPiece {
    if let Some(marker) = &config.continuation_marker {
        wp = wp.with_marker(marker.as_str());
    }
    if let Some(unk) = &config.unk_token {
        wp = wp.with_unk_token(unk.as_str());
    }
    if let Some(max) = config.max_input_chars_per_word {
        wp = wp.with_max_input_chars(max);
    }
    wp.with_normalization(config.normalization)
}

/// Tokenizes every query word once and builds the trie from the ones that
/// can match. Words that are unknown to the tokenizer or tokenize to nothing
/// are removed from `probs` and reported.
pub fn build_query_trie(
    probs: &mut SampleProbs,
    tokenizer: &WordPiece,
) -> Result<(QueryTrie, Vec<Skipped>)> {
    let mut tokenized: HashMap<String, Vec<String>> = HashMap::with_capacity(probs.len());
    let mut skipped = Vec::new();
    for word in probs.words() {
        let pieces = tokenizer.tokenize_word(word);
        let reason = if pieces.is_empty() {
            SkipReason::EmptyTokenization
        } else if tokenizer.is_unknown(&pieces) {
            SkipReason::UnknownToTokenizer
        } else {
            tokenized.insert(word.to_string(), pieces);
            continue;
        };
        debug!(word, ?reason, "query word not searchable");
        skipped.push(Skipped {
            word: word.to_string(),
            reason,
        });
    }
    probs.retain(|w| tokenized.contains_key(w));

    let cached = |word: &str| tokenized.get(word).cloned().unwrap_or_default();
    let trie = QueryTrie::build(probs.words(), &cached)?;
    let shadowed = trie.words().len() - trie.reachable_words().count();
    if shadowed > 0 {
        warn!(shadowed, "query words share a tokenization; the last one wins");
    }
    Ok((trie, skipped))
}

/// Scans the whole corpus and writes every accepted context to `out`.
pub fn sample_corpus<R: BufRead, W: Write>(
    config: &RunConfig,
    trie: &QueryTrie,
    classifier: &PieceClassifier,
    probs: &SampleProbs,
    mut corpus: CorpusReader<R>,
    out: W,
) -> Result<RunSummary> {
    let mut writer = ContextWriter::new(out, trie)?;

    let (matches, counts) = if config.jobs == 1 {
        let mut sampler =
            ContextSampler::new(trie, classifier, probs, ChaCha8Rng::seed_from_u64(config.seed));
        let mut buf = Vec::new();
        for line in corpus.by_ref() {
            sampler.sample_line(line?.into(), &mut buf);
            for ctx in buf.drain(..) {
                writer.write(&ctx)?;
            }
        }
        (sampler.matches(), sampler.into_counts())
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build()
            .map_err(|e| ContextError::InvalidArgument(format!("thread pool: {e}")))?;
        let mut merger = ShardMerger::new(trie.words().len());
        let mut next_shard = 0u64;
        loop {
            // one shard per thread in flight
            let window = corpus
                .batches(config.shard_lines)
                .take(config.jobs)
                .collect::<Result<Vec<_>>>()?;
            if window.is_empty() {
                break;
            }
            let n = window.len() as u64;
            let outputs = pool.install(|| {
                sample_shards(trie, classifier, probs, config.seed, next_shard, window)
            });
            next_shard += n;
            for mut shard in outputs {
                merger.merge(&mut shard);
                for ctx in &shard.contexts {
                    writer.write(ctx)?;
                }
            }
            debug!(shards = next_shard, lines = corpus.lines_read(), "shards done");
        }
        (merger.matches(), merger.into_counts())
    };

    let records = writer.written();
    writer.finish()?;
    Ok(summarize(trie, &corpus, matches, records, &counts))
}

fn summarize<R>(
    trie: &QueryTrie,
    corpus: &CorpusReader<R>,
    matches: u64,
    records: u64,
    counts: &SampleCounts,
) -> RunSummary
where
    R: BufRead,
{
    let counts = trie
        .reachable_words()
        .map(|id| (trie.word(id).to_string(), counts.get(id)))
        .collect();
    RunSummary {
        lines_read: corpus.lines_read(),
        lines_rejected: corpus.lines_rejected(),
        matches,
        records,
        counts,
    }
}

/// Runs the whole pipeline from files.
pub fn run(config: &RunConfig, inputs: &RunInputs) -> Result<RunSummary> {
    config.validate()?;

    let freqs = vocab::load_frequencies(&inputs.frequencies)?;
    info!(words = freqs.len(), "loaded frequency table");
    let query = vocab::load_query_words(&inputs.query_words)?;
    info!(words = query.len(), "loaded query words");

    let (mut probs, mut skipped) = SampleProbs::from_frequencies(&query, &freqs, config.target_count);
    drop(freqs);

    let tokenizer = configure_tokenizer(WordPiece::from_path(&inputs.tokenizer)?, config);
    let classifier = tokenizer.classifier();
    info!(
        pieces = tokenizer.vocab_len(),
        continuations = classifier.len(),
        marker = tokenizer.marker(),
        "loaded wordpiece vocabulary"
    );

    let (trie, unsearchable) = build_query_trie(&mut probs, &tokenizer)?;
    skipped.extend(unsearchable);
    if !skipped.is_empty() {
        warn!(skipped = skipped.len(), "query words without contexts to sample");
    }
    info!(words = probs.len(), nodes = trie.node_count(), "built query trie");

    if let Some(path) = &inputs.save_trie {
        let mut w = BufWriter::new(File::create(path)?);
        trie.to_writer(&mut w)?;
        w.flush()?;
        info!(path = %path.display(), "saved query trie");
    }

    let corpus = CorpusReader::open(&inputs.corpus, config.max_line_pieces)?;
    let out: Box<dyn Write> = match &inputs.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let summary = sample_corpus(config, &trie, &classifier, &probs, corpus, out)?;

    if summary.lines_rejected > 0 {
        warn!(
            lines = summary.lines_rejected,
            max = config.max_line_pieces,
            "skipped corpus lines over the length limit"
        );
    }
    for word in summary.zero_count_words() {
        debug!(word, "no contexts sampled");
    }
    info!(
        lines = summary.lines_read,
        matches = summary.matches,
        records = summary.records,
        zero_count_words = summary.zero_count_words().count(),
        "sampling done"
    );
    Ok(summary)
}

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ctxsample::config::{RunConfig, RunInputs, DEFAULT_SEED, DEFAULT_SHARD_LINES, DEFAULT_TARGET_COUNT};
use ctxsample::corpus::DEFAULT_MAX_LINE_PIECES;
use ctxsample::run::{run, RunSummary};
use ctxsample::wordpiece::Normalization;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NormalizeArg {
    None,
    Nfc,
}

impl From<NormalizeArg> for Normalization {
    fn from(arg: NormalizeArg) -> Self {
        match arg {
            NormalizeArg::None => Normalization::None,
            NormalizeArg::Nfc => Normalization::Nfc,
        }
    }
}

/// Samples contexts of query words from a wordpiece-tokenized corpus.
///
/// Records are written as tab-separated rows with the header
/// token, counter, context_len, focus_index, focus_len, context.
#[derive(Parser, Debug)]
#[clap(name = "ctxsample", version)]
struct Args {
    /// Query words, one per line (first field is used).
    #[clap(short = 'q', long)]
    query_words: PathBuf,

    /// Corpus frequency table with `word count` lines.
    #[clap(short = 'f', long)]
    vocab: PathBuf,

    /// Wordpiece vocabulary: vocab.txt or tokenizer.json.
    #[clap(short = 't', long)]
    tokenizer: PathBuf,

    /// Pretokenized corpus, one line of space-separated pieces per sentence.
    #[clap(short = 'c', long)]
    corpus: PathBuf,

    /// Output file. Defaults to stdout.
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    /// Approximate number of contexts to sample per query word.
    #[clap(short = 'n', long, default_value_t = DEFAULT_TARGET_COUNT)]
    count: u64,

    /// Seed of the random source.
    #[clap(long, env = "CTXSAMPLE_SEED", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Corpus lines with more pieces than this are skipped.
    #[clap(long, default_value_t = DEFAULT_MAX_LINE_PIECES)]
    max_line_pieces: usize,

    /// Continuation marker, overriding the tokenizer's.
    #[clap(long)]
    marker: Option<String>,

    /// Unknown token, overriding the tokenizer's.
    #[clap(long)]
    unk_token: Option<String>,

    /// Words longer than this many characters tokenize to the unknown token.
    #[clap(long)]
    max_input_chars: Option<usize>,

    /// Unicode normalization applied to query words before tokenizing.
    #[clap(long, value_enum, default_value = "none")]
    normalize: NormalizeArg,

    /// Worker threads. More than one samples the corpus in shards.
    #[clap(short = 'j', long, default_value_t = 1)]
    jobs: usize,

    /// Lines per shard when running with several jobs.
    #[clap(long, default_value_t = DEFAULT_SHARD_LINES)]
    shard_lines: usize,

    /// Writes the query trie as JSON to this path.
    #[clap(long)]
    save_trie: Option<PathBuf>,

    /// Prints the number of records per query word to stderr.
    #[clap(long)]
    counts: bool,
}

impl Args {
    fn split(self) -> (RunConfig, RunInputs, bool) {
        let config = RunConfig {
            target_count: self.count,
            seed: self.seed,
            max_line_pieces: self.max_line_pieces,
            continuation_marker: self.marker,
            unk_token: self.unk_token,
            max_input_chars_per_word: self.max_input_chars,
            normalization: self.normalize.into(),
            jobs: self.jobs,
            shard_lines: self.shard_lines,
        };
        let inputs = RunInputs {
            query_words: self.query_words,
            frequencies: self.vocab,
            tokenizer: self.tokenizer,
            corpus: self.corpus,
            output: self.output,
            save_trie: self.save_trie,
        };
        (config, inputs, self.counts)
    }
}

fn format_line(count: &str, label: &str) -> String {
    format!("{:>8} {}\n", count, label)
}

fn print_counts(summary: &RunSummary) {
    for (word, count) in &summary.counts {
        eprint!("{}", format_line(&count.to_string(), word));
    }
    eprint!("{}", format_line(&summary.records.to_string(), "total"));
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (config, inputs, show_counts) = Args::parse().split();
    tracing::debug!(?config, ?inputs, "starting");

    let summary = run(&config, &inputs)?;
    if show_counts {
        print_counts(&summary);
    }
    Ok(())
}

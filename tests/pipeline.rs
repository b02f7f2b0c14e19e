use std::fs;
use std::path::Path;

use ctxsample::config::{RunConfig, RunInputs};
use ctxsample::run::run;
use ctxsample::QueryTrie;
use tempfile::TempDir;

const VOCAB_TXT: &str = "[PAD]\n[UNK]\nDie\ndie\nWahr\n##scheinlich\n##keit\n##heit\nist\nHaus\nHäuser\n##er\ngroß\n.\n";

const FREQUENCIES: &str = "die 5000\nist 4000\nHaus 20\nHäuser 5\nWahrscheinlichkeit 4\nWahrheit 8\nnie 0\nZwerg 3\n";

const QUERY_WORDS: &str = "Haus\nHäuser\nWahrscheinlichkeit\nWahrheit\nnie\nfehlt\nZwerg\n";

fn corpus() -> String {
    let mut text = String::new();
    for i in 0..60 {
        match i % 4 {
            0 => text.push_str("Die Wahr ##scheinlich ##keit ist groß .\n"),
            1 => text.push_str("die Häuser ist Haus ##er .\n"),
            2 => text.push_str("##keit Haus .\n"),
            _ => text.push_str("die Wahr ##heit ist die Wahr ##heit\n"),
        }
    }
    // over the limit configured below
    text.push_str(&"ist ".repeat(40));
    text.push('\n');
    text
}

fn setup() -> (TempDir, RunInputs) {
    let dir = TempDir::new().unwrap();
    let write = |name: &str, body: &str| {
        let p = dir.path().join(name);
        fs::write(&p, body).unwrap();
        p
    };
    let inputs = RunInputs {
        query_words: write("query.txt", QUERY_WORDS),
        frequencies: write("freq.txt", FREQUENCIES),
        tokenizer: write("vocab.txt", VOCAB_TXT),
        corpus: write("corpus.txt", &corpus()),
        output: Some(dir.path().join("out.tsv")),
        save_trie: Some(dir.path().join("trie.json")),
    };
    (dir, inputs)
}

fn config(jobs: usize) -> RunConfig {
    RunConfig {
        target_count: 8,
        max_line_pieces: 20,
        jobs,
        shard_lines: 7,
        ..Default::default()
    }
}

fn rows(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.split('\t').map(String::from).collect())
        .collect()
}

#[test]
fn sequential_run_end_to_end() {
    let (_dir, inputs) = setup();
    let summary = run(&config(1), &inputs).unwrap();

    assert_eq!(summary.lines_read, 61);
    assert_eq!(summary.lines_rejected, 1);
    // Haus x15, Häuser x15, Wahrscheinlichkeit x15, Wahrheit x30
    assert_eq!(summary.matches, 75);

    let out = rows(inputs.output.as_ref().unwrap());
    assert_eq!(
        out[0],
        vec!["token", "counter", "context_len", "focus_index", "focus_len", "context"]
    );
    assert_eq!(out.len() as u64, summary.records + 1);

    // probability >= 1 for every word but Haus
    let count = |w: &str| summary.counts.iter().find(|(x, _)| x == w).unwrap().1;
    assert_eq!(count("Häuser"), 15);
    assert_eq!(count("Wahrscheinlichkeit"), 15);
    assert_eq!(count("Wahrheit"), 30);
    assert!(count("Haus") <= 15);
    assert!(summary.counts.iter().all(|(w, _)| w != "nie" && w != "fehlt"));

    for row in &out[1..] {
        let pieces: Vec<&str> = row[5].split(' ').collect();
        let len: usize = row[2].parse().unwrap();
        let start: usize = row[3].parse().unwrap();
        let focus: usize = row[4].parse().unwrap();
        assert_eq!(pieces.len(), len);
        match row[0].as_str() {
            "Wahrscheinlichkeit" => {
                assert_eq!(&pieces[start..start + focus], ["Wahr", "##scheinlich", "##keit"])
            }
            "Wahrheit" => assert_eq!(&pieces[start..start + focus], ["Wahr", "##heit"]),
            "Häuser" => assert_eq!((start, focus), (1, 1)),
            // "Haus ##er" on the same lines is not a query word
            "Haus" => assert_eq!((pieces[start], start, focus), ("Haus", 1, 1)),
            other => panic!("unexpected word {other}"),
        }
    }
}

#[test]
fn counters_are_consecutive_per_word() {
    let (_dir, inputs) = setup();
    run(&config(1), &inputs).unwrap();
    let out = rows(inputs.output.as_ref().unwrap());
    let mut last = std::collections::HashMap::new();
    for row in &out[1..] {
        let c: u64 = row[1].parse().unwrap();
        let prev = last.insert(row[0].clone(), c).unwrap_or(0);
        assert_eq!(c, prev + 1);
    }
}

#[test]
fn fixed_seed_reproduces_output() {
    let (_dir, inputs) = setup();
    run(&config(1), &inputs).unwrap();
    let first = fs::read(inputs.output.as_ref().unwrap()).unwrap();
    run(&config(1), &inputs).unwrap();
    assert_eq!(first, fs::read(inputs.output.as_ref().unwrap()).unwrap());
}

#[test]
fn sharded_output_is_independent_of_job_count() {
    let (_dir, inputs) = setup();
    let a = run(&config(2), &inputs).unwrap();
    let first = fs::read(inputs.output.as_ref().unwrap()).unwrap();
    let b = run(&config(4), &inputs).unwrap();
    assert_eq!(first, fs::read(inputs.output.as_ref().unwrap()).unwrap());
    assert_eq!(a.counts, b.counts);
    assert_eq!(a.matches, 75);
    assert_eq!(a.lines_rejected, 1);
}

#[test]
fn saved_trie_loads_back() {
    let (_dir, inputs) = setup();
    run(&config(1), &inputs).unwrap();
    let file = fs::File::open(inputs.save_trie.as_ref().unwrap()).unwrap();
    let trie = QueryTrie::from_reader(file).unwrap();
    // Zwerg is unknown to the vocabulary and never reaches the trie
    assert_eq!(
        trie.words(),
        &["Haus", "Häuser", "Wahrscheinlichkeit", "Wahrheit"].map(String::from)
    );
}

#[test]
fn invalid_config_is_rejected_before_reading_inputs() {
    let cfg = RunConfig {
        target_count: 0,
        ..Default::default()
    };
    let err = run(&cfg, &RunInputs::default()).unwrap_err();
    assert!(err.to_string().contains("target count"));
}

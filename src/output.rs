//! Tab-separated output of sampled contexts.

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::sampler::Context;
use crate::trie::QueryTrie;

pub const HEADER: [&str; 6] = [
    "token",
    "counter",
    "context_len",
    "focus_index",
    "focus_len",
    "context",
];

pub struct ContextWriter<'t, W: Write> {
    out: BufWriter<W>,
    trie: &'t QueryTrie,
    written: u64,
}

impl<'t, W: Write> ContextWriter<'t, W> {
    /// Writes the header row right away.
    pub fn new(out: W, trie: &'t QueryTrie) -> Result<Self> {
        let mut out = BufWriter::new(out);
        writeln!(out, "{}", HEADER.join("\t"))?;
        Ok(ContextWriter {
            out,
            trie,
            written: 0,
        })
    }

    pub fn write(&mut self, ctx: &Context) -> Result<()> {
        write!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t",
            self.trie.word(ctx.word),
            ctx.counter,
            ctx.line.len(),
            ctx.start,
            ctx.len
        )?;
        for (i, piece) in ctx.line.iter().enumerate() {
            if i > 0 {
                self.out.write_all(b" ")?;
            }
            self.out.write_all(piece.as_bytes())?;
        }
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        self.out
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn header_and_row_layout() {
        let split = |w: &str| match w {
            "Wahrheit" => vec!["Wahr".to_string(), "##heit".to_string()],
            _ => vec![w.to_string()],
        };
        let trie = QueryTrie::build(["Wahrheit"], &split).unwrap();
        let line: Arc<[String]> = ["die", "Wahr", "##heit", "siegt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut w = ContextWriter::new(Vec::new(), &trie).unwrap();
        w.write(&Context {
            word: 0,
            counter: 3,
            line,
            start: 1,
            len: 2,
        })
        .unwrap();
        assert_eq!(w.written(), 1);
        let text = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "token\tcounter\tcontext_len\tfocus_index\tfocus_len\tcontext\n\
             Wahrheit\t3\t4\t1\t2\tdie Wahr ##heit siegt\n"
        );
    }
}

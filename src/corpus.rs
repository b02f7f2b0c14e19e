//! Reader for a pretokenized corpus: one sentence per line, pieces separated
//! by whitespace.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::Result;

pub const DEFAULT_MAX_LINE_PIECES: usize = 510;

pub struct CorpusReader<R> {
    reader: R,
    buf: String,
    max_pieces: usize,
    lines_read: u64,
    lines_rejected: u64,
}

impl CorpusReader<BufReader<File>> {
    pub fn open(path: &Path, max_pieces: usize) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?), max_pieces))
    }
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, max_pieces: usize) -> Self {
        CorpusReader {
            reader,
            buf: String::new(),
            max_pieces,
            lines_read: 0,
            lines_rejected: 0,
        }
    }

    /// Physical lines consumed, rejected ones included.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Lines dropped for having more than the allowed number of pieces.
    pub fn lines_rejected(&self) -> u64 {
        self.lines_rejected
    }

    /// Groups accepted lines into batches of at most `size` lines.
    pub fn batches(&mut self, size: usize) -> Batches<'_, R> {
        Batches {
            reader: self,
            size: size.max(1),
        }
    }

    fn read_line(&mut self) -> Option<Result<Vec<String>>> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.lines_read += 1;
            let pieces: Vec<String> = self.buf.split_whitespace().map(String::from).collect();
            if pieces.len() > self.max_pieces {
                self.lines_rejected += 1;
                debug!(
                    line = self.lines_read,
                    pieces = pieces.len(),
                    max = self.max_pieces,
                    "skipping oversized line"
                );
                continue;
            }
            return Some(Ok(pieces));
        }
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line()
    }
}

pub struct Batches<'r, R> {
    reader: &'r mut CorpusReader<R>,
    size: usize,
}

impl<R: BufRead> Iterator for Batches<'_, R> {
    type Item = Result<Vec<Vec<String>>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.reader.read_line() {
                Some(Ok(line)) => batch.push(line),
                Some(Err(e)) => return Some(Err(e)),
                None => break,
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

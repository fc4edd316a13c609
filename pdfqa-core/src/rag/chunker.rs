//! Recursive text chunking for RAG.
//!
//! Text is split at the highest-priority separator it contains. Pieces that
//! are still too long are split again with the remaining separators, down to
//! single characters for the empty separator. Small pieces are then merged back
//! up to `chunk_size`, and each new chunk starts with up to `chunk_overlap`
//! characters taken from the end of the previous one.
//!
//! Sizes are counted in `char`s, so a chunk never splits a UTF-8 sequence.

use crate::config::RagConfig;
use std::collections::VecDeque;

/// A chunk produced by [`Chunker::split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Number of leading characters repeated from the previous chunk.
    pub overlap: usize,
}

impl Chunk {
    /// The part of the chunk that is new relative to the previous chunk.
    pub fn fresh(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((offset, _)) => &self.text[offset..],
            None => "",
        }
    }
}

/// Splits text into overlapping chunks under a size policy.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators,
        }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap, config.separators.clone())
    }

    /// Splits `text` into chunks. Concatenating [`Chunk::fresh`] of every
    /// chunk gives back `text` unchanged.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        if !text.is_empty() {
            self.split_recursive(text, &self.separators, &mut chunks);
        }
        chunks
    }

    /// Convenience wrapper returning only the chunk texts.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split(text).into_iter().map(|c| c.text).collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String], out: &mut Vec<Chunk>) {
        // Pick the first separator present in the text; "" always applies.
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep.as_str()));
        let (separator, remaining): (&str, &[String]) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => (separators.last().map_or("", String::as_str), &[]),
        };

        let mut small: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                self.merge(&small, out);
                small.clear();
            }

            if remaining.is_empty() {
                // Atomic piece: nothing left to split it with.
                out.push(Chunk {
                    text: piece.to_string(),
                    overlap: 0,
                });
            } else {
                self.split_recursive(piece, remaining, out);
            }
        }

        if !small.is_empty() {
            self.merge(&small, out);
        }
    }

    /// Merges contiguous pieces into chunks of at most `chunk_size` chars.
    fn merge(&self, pieces: &[&str], out: &mut Vec<Chunk>) {
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;
        let mut carried = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !current.is_empty() {
                out.push(Chunk {
                    text: current.iter().map(|(p, _)| *p).collect(),
                    overlap: carried,
                });

                // Keep a tail of the emitted chunk as overlap for the next one.
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
                carried = total;
            }

            current.push_back((piece, len));
            total += len;
        }

        if !current.is_empty() {
            out.push(Chunk {
                text: current.iter().map(|(p, _)| *p).collect(),
                overlap: carried,
            });
        }
    }
}

/// Splits `text` after every occurrence of `separator`, keeping the separator
/// at the end of the piece it terminates. The empty separator yields one
/// piece per character. Empty pieces are dropped.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (offset, matched) in text.match_indices(separator) {
        let end = offset + matched.len();
        if end > start {
            pieces.push(&text[start..end]);
        }
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

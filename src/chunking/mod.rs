#![expect(
    clippy::string_slice,
    reason = "span offsets always come from match_indices/char_indices boundaries"
)]


use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// A contiguous span of extracted text, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the document's chunk sequence
    pub index: usize,
    /// Byte offset of the chunk in the source text
    pub start: usize,
    /// The chunk text, equal to `source[start..start + text.len()]`
    pub text: String,
}

impl Chunk {
    /// Byte offset one past the end of the chunk in the source text
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    #[inline]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Configuration for text chunking. Sizes are measured in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound for a chunk, exceeded only when no separator splits a piece
    pub chunk_size: usize,
    /// Maximum trailing context repeated at the start of the next chunk
    pub chunk_overlap: usize,
    /// Separators tried in priority order; `""` splits between characters
    pub separators: Vec<String>,
    /// Trim chunk edges and drop whitespace-only chunks
    pub strip_whitespace: bool,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
            strip_whitespace: true,
        }
    }
}

/// Byte range into the source text plus its length in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    chars: usize,
}

impl Span {
    fn new(source: &str, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            chars: source[start..end].chars().count(),
        }
    }
}

/// Recursive separator splitter producing overlapping, size-bounded chunks
#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into chunks covering all of its non-whitespace content, in order
    #[inline]
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let separators: Vec<&str> = self.config.separators.iter().map(String::as_str).collect();
        let spans = self.split_span(text, Span::new(text, 0, text.len()), &separators);

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(index, span)| Chunk {
                index,
                start: span.start,
                text: text[span.start..span.end].to_string(),
            })
            .collect();

        debug!(
            "Split {} chars into {} chunks (size {}, overlap {})",
            text.chars().count(),
            chunks.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );

        chunks
    }

    fn split_span(&self, source: &str, span: Span, separators: &[&str]) -> Vec<Span> {
        let (separator, remaining) = pick_separator(&source[span.start..span.end], separators);
        let pieces = split_keeping_separator(source, span, separator);

        let mut spans = Vec::new();
        let mut small_pieces = Vec::new();

        for piece in pieces {
            if piece.chars < self.config.chunk_size {
                small_pieces.push(piece);
                continue;
            }

            if !small_pieces.is_empty() {
                spans.extend(self.merge_pieces(source, &small_pieces));
                small_pieces.clear();
            }

            if remaining.is_empty() {
                spans.extend(self.finish_span(source, piece));
            } else {
                spans.extend(self.split_span(source, piece, remaining));
            }
        }

        if !small_pieces.is_empty() {
            spans.extend(self.merge_pieces(source, &small_pieces));
        }

        spans
    }

    /// Merge contiguous pieces into windows of at most `chunk_size` characters.
    /// When a window closes, pieces are dropped from its front until no more than
    /// `chunk_overlap` characters remain to seed the next window.
    fn merge_pieces(&self, source: &str, pieces: &[Span]) -> Vec<Span> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut spans = Vec::new();
        let mut window: VecDeque<Span> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            if total + piece.chars > size && !window.is_empty() {
                spans.extend(self.finish_span(source, join_window(&window, total)));

                while total > overlap || (total + piece.chars > size && total > 0) {
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total -= first.chars;
                }
            }

            window.push_back(piece);
            total += piece.chars;
        }

        if !window.is_empty() {
            spans.extend(self.finish_span(source, join_window(&window, total)));
        }

        spans
    }

    fn finish_span(&self, source: &str, span: Span) -> Option<Span> {
        if !self.config.strip_whitespace {
            return (span.start < span.end).then_some(span);
        }

        let segment = &source[span.start..span.end];
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return None;
        }

        let start = span.start + (segment.len() - segment.trim_start().len());
        Some(Span::new(source, start, start + trimmed.len()))
    }
}

fn join_window(window: &VecDeque<Span>, total: usize) -> Span {
    let start = window.front().map_or(0, |span| span.start);
    let end = window.back().map_or(start, |span| span.end);
    Span {
        start,
        end,
        chars: total,
    }
}

/// Pick the first separator present in `text`; returns it with the separators
/// left for recursive splitting of oversized pieces.
fn pick_separator<'a, 's>(text: &str, separators: &'s [&'a str]) -> (&'a str, &'s [&'a str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }

    (separators.last().copied().unwrap_or_default(), &[])
}

/// Split a span on `separator`, attaching each separator to the start of the
/// piece that follows it. An empty separator yields single characters.
fn split_keeping_separator(source: &str, span: Span, separator: &str) -> Vec<Span> {
    let segment = &source[span.start..span.end];

    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(offset, ch)| Span {
                start: span.start + offset,
                end: span.start + offset + ch.len_utf8(),
                chars: 1,
            })
            .collect();
    }

    let mut boundaries: Vec<usize> = segment
        .match_indices(separator)
        .map(|(offset, _)| span.start + offset)
        .collect();
    boundaries.insert(0, span.start);
    boundaries.push(span.end);

    boundaries
        .windows(2)
        .filter(|pair| pair[0] < pair[1])
        .map(|pair| Span::new(source, pair[0], pair[1]))
        .collect()
}

//! Sentence segmentation for streaming TTS
//!
//! Vendor TTS backends start speaking faster and fail less on short input,
//! so long responses are fed to the speaker one sentence at a time. A
//! [`StreamCursor`] hands those sentences out in order, can be filled
//! incrementally by a producer, and can be cancelled at any point.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Longest chunk (in chars) handed to TTS before a forced split
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 120;

/// Punctuation that ends a sentence only when followed by whitespace
const ASCII_TERMINATORS: &[char] = &['.', '!', '?', ';'];

/// Punctuation that always ends a sentence
const WIDE_TERMINATORS: &[char] = &['。', '！', '？', '；', '…', '\n'];

/// Characters that stay attached to the preceding terminator
const CLOSERS: &[char] = &['"', '\'', ')', ']', '”', '’', '）', '」', '』'];

fn is_terminator(c: char) -> bool {
    ASCII_TERMINATORS.contains(&c) || WIDE_TERMINATORS.contains(&c)
}

/// Splits text into sentence-sized chunks
#[derive(Debug, Clone, Copy)]
pub struct StreamSegmenter {
    max_chars: usize,
}

impl Default for StreamSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_CHARS)
    }
}

impl StreamSegmenter {
    /// Create a segmenter; `max_chars` of 0 means the default
    #[must_use]
    pub const fn new(max_chars: usize) -> Self {
        let max_chars = if max_chars == 0 {
            DEFAULT_MAX_CHUNK_CHARS
        } else {
            max_chars
        };
        Self { max_chars }
    }

    /// Split complete text into trimmed, non-empty chunks
    #[must_use]
    pub fn segment(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        self.split_sentences(text, true, &mut chunks);
        chunks
    }

    /// Split as much of `text` as forms whole sentences
    ///
    /// Returns the byte offset up to which `text` was consumed. With
    /// `at_end` set, everything is consumed.
    fn split_sentences(self, text: &str, at_end: bool, out: &mut Vec<String>) -> usize {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (_, c) = chars[i];
            if !is_terminator(c) {
                i += 1;
                continue;
            }

            // Absorb runs like "?!" or "..." plus closing quotes
            let mut j = i + 1;
            while j < chars.len() && c != '\n' {
                let next = chars[j].1;
                if next != '\n' && (is_terminator(next) || CLOSERS.contains(&next)) {
                    j += 1;
                } else {
                    break;
                }
            }

            let end = chars.get(j).map_or(text.len(), |&(idx, _)| idx);
            let boundary = if ASCII_TERMINATORS.contains(&c) {
                chars
                    .get(j)
                    .map_or(at_end, |&(_, next)| next.is_whitespace())
            } else {
                true
            };

            if boundary {
                self.hard_split(&text[start..end], out);
                start = end;
            }
            i = j;
        }

        if at_end {
            self.hard_split(&text[start..], out);
            return text.len();
        }

        start
    }

    /// Push `piece` as one or more chunks no longer than `max_chars`
    ///
    /// Prefers breaking on whitespace, falls back to a char boundary.
    fn hard_split(self, piece: &str, out: &mut Vec<String>) {
        let mut rest = piece.trim();

        while rest.chars().count() > self.max_chars {
            let limit = rest
                .char_indices()
                .nth(self.max_chars)
                .map_or(rest.len(), |(idx, _)| idx);
            // A word ending exactly at the limit still fits
            let cut = if rest[limit..].starts_with(char::is_whitespace) {
                limit
            } else {
                rest[..limit]
                    .rfind(char::is_whitespace)
                    .filter(|&idx| idx > 0)
                    .unwrap_or(limit)
            };

            let chunk = rest[..cut].trim();
            if !chunk.is_empty() {
                out.push(chunk.to_string());
            }
            rest = rest[cut..].trim_start();
        }

        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
}

/// Result of asking a cursor for its next chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorPoll {
    /// Next chunk in order
    Chunk(String),
    /// Nothing ready yet, the producer has not finished
    Pending,
    /// No further chunks will ever be produced
    Finished,
}

#[derive(Debug, Default)]
struct CursorState {
    ready: VecDeque<String>,
    /// Text received but not yet forming a whole sentence
    partial: String,
    finished: bool,
    cancelled: bool,
}

/// Ordered, cancellable sequence of text chunks
///
/// Clones share the same sequence, so a producer can keep pushing text while
/// the dispatcher consumes chunks.
#[derive(Debug, Clone, Default)]
pub struct StreamCursor {
    segmenter: StreamSegmenter,
    state: Arc<Mutex<CursorState>>,
}

impl StreamCursor {
    /// Create an open cursor to be filled with [`push`](Self::push)
    #[must_use]
    pub fn new(segmenter: StreamSegmenter) -> Self {
        Self {
            segmenter,
            state: Arc::default(),
        }
    }

    /// Create a finished cursor holding every sentence of `text`
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::from_text_with(StreamSegmenter::default(), text)
    }

    /// Like [`from_text`](Self::from_text) with a custom segmenter
    #[must_use]
    pub fn from_text_with(segmenter: StreamSegmenter, text: &str) -> Self {
        let cursor = Self::new(segmenter);
        {
            let mut state = cursor.lock();
            state.ready = segmenter.segment(text).into();
            state.finished = true;
        }
        cursor
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CursorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append producer text; whole sentences become available immediately
    pub fn push(&self, text: &str) {
        let mut state = self.lock();
        if state.finished || state.cancelled {
            tracing::debug!("ignoring text pushed to closed stream");
            return;
        }

        state.partial.push_str(text);
        let mut chunks = Vec::new();
        let consumed = self
            .segmenter
            .split_sentences(&state.partial, false, &mut chunks);
        state.partial.replace_range(..consumed, "");

        // Don't let a run-on sentence stall playback
        if state.partial.chars().count() > self.segmenter.max_chars {
            let mut pieces = Vec::new();
            self.segmenter.hard_split(&state.partial, &mut pieces);
            let mut tail = pieces.pop().unwrap_or_default();
            if state.partial.ends_with(char::is_whitespace) {
                tail.push(' ');
            }
            chunks.extend(pieces);
            state.partial = tail;
        }

        state.ready.extend(chunks);
    }

    /// Mark the producer done; any buffered text becomes the last chunk
    pub fn finish(&self) {
        let mut state = self.lock();
        if state.finished || state.cancelled {
            return;
        }

        let partial = std::mem::take(&mut state.partial);
        let mut chunks = Vec::new();
        self.segmenter.split_sentences(&partial, true, &mut chunks);
        state.ready.extend(chunks);
        state.finished = true;
    }

    /// Stop the sequence; later polls report [`CursorPoll::Finished`]
    ///
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        state.ready.clear();
        state.partial.clear();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Take the next chunk, if one is ready
    #[must_use]
    pub fn next_chunk(&self) -> CursorPoll {
        let mut state = self.lock();
        if state.cancelled {
            return CursorPoll::Finished;
        }

        match state.ready.pop_front() {
            Some(chunk) => CursorPoll::Chunk(chunk),
            None if state.finished => CursorPoll::Finished,
            None => CursorPoll::Pending,
        }
    }
}

// Greedy single-pass diff between two byte streams.
//
// Each call to `DiffEngine::next_hunk` skips the common prefix, then
// collects differing target bytes into a `Run` until the streams agree
// again, either stream runs out, or the run reaches the 16-bit field limit.
// This is not a minimal edit script; it only distinguishes runs of one
// repeated value from arbitrary literal runs.

use std::io::{Read, Seek, Write};

use super::MAX_HUNK_LEN;
use super::hunk::{Hunk, HunkBody};
use crate::error::Result;
use crate::stream::ByteStream;

// ---------------------------------------------------------------------------
// Run accumulator
// ---------------------------------------------------------------------------

/// Differing bytes collected for one hunk.
///
/// Starts as `Repeat` and stays there while every byte equals the first.
/// The first byte that differs switches it to `Literal` for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Repeat { value: u8, count: u16 },
    Literal(Vec<u8>),
}

impl Run {
    pub fn new(first: u8) -> Self {
        Self::Repeat {
            value: first,
            count: 1,
        }
    }

    /// Append one target byte. The caller keeps `len() < MAX_HUNK_LEN`.
    pub fn push(&mut self, byte: u8) {
        debug_assert!(self.len() < MAX_HUNK_LEN);
        match self {
            Self::Repeat { value, count } if *value == byte => *count += 1,
            Self::Repeat { value, count } => {
                let mut bytes = vec![*value; *count as usize];
                bytes.push(byte);
                *self = Self::Literal(bytes);
            }
            Self::Literal(bytes) => bytes.push(byte),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Repeat { count, .. } => *count as usize,
            Self::Literal(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, Self::Repeat { .. })
    }

    pub fn into_hunk(self, offset: u64) -> Hunk {
        match self {
            Self::Repeat { value, count } => Hunk::rle(offset, count, value),
            Self::Literal(bytes) => Hunk::new(offset, HunkBody::Literal(bytes)),
        }
    }
}

// ---------------------------------------------------------------------------
// Diff engine
// ---------------------------------------------------------------------------

/// Lazily yields the hunks that turn `source` into `target`.
///
/// Offsets are source positions. Bytes of the longer stream past the end of
/// the shorter one are never compared.
pub struct DiffEngine<'a, S, T>
where
    S: Read + Write + Seek,
    T: Read + Write + Seek,
{
    source: &'a mut ByteStream<S>,
    target: &'a mut ByteStream<T>,
}

impl<'a, S, T> DiffEngine<'a, S, T>
where
    S: Read + Write + Seek,
    T: Read + Write + Seek,
{
    pub fn new(source: &'a mut ByteStream<S>, target: &'a mut ByteStream<T>) -> Self {
        Self { source, target }
    }

    fn exhausted(&self) -> bool {
        self.source.is_end() || self.target.is_end()
    }

    /// Produce the next hunk, or `None` once either stream is exhausted
    /// without another mismatch.
    pub fn next_hunk(&mut self) -> Result<Option<Hunk>> {
        let (offset, first) = loop {
            if self.exhausted() {
                return Ok(None);
            }
            let offset = self.source.tell();
            let s = self.source.read_u8()?;
            let t = self.target.read_u8()?;
            if s != t {
                break (offset, t);
            }
        };

        let mut run = Run::new(first);
        // The window is checked before reading so no differing pair is
        // consumed without being recorded.
        while run.len() < MAX_HUNK_LEN && !self.exhausted() {
            let s = self.source.read_u8()?;
            let t = self.target.read_u8()?;
            if s == t {
                break;
            }
            run.push(t);
        }

        let hunk = run.into_hunk(offset);
        log::debug!("diff: {hunk}");
        Ok(Some(hunk))
    }
}

impl<S, T> Iterator for DiffEngine<'_, S, T>
where
    S: Read + Write + Seek,
    T: Read + Write + Seek,
{
    type Item = Result<Hunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_hunk().transpose()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

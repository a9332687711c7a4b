// IPS hunk record and its wire codec.
//
// Wire layout of one hunk (all integers big-endian):
//
//   offset  u24
//   length  u16     0 means run-length encoded
//   if length != 0: `length` literal bytes
//   if length == 0: count u16, value u8
//
// A hunk with length 0 and count 0 is a no-op. It can be parsed but is
// never written.

use std::fmt;
use std::io::{Read, Seek, Write};

use super::{MAX_HUNK_LEN, MAX_OFFSET};
use crate::error::{PatchError, Result};
use crate::stream::ByteStream;

/// What to do with a hunk whose offset does not fit in 24 bits when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the hunk and log a warning.
    #[default]
    Skip,
    /// Abort with `PatchError::AddressSpaceOverflow`.
    Fail,
}

/// Payload of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkBody {
    /// 1..=65535 bytes copied verbatim.
    Literal(Vec<u8>),
    /// `value` repeated `count` times.
    Rle { count: u16, value: u8 },
}

/// One contiguous edit at `offset` in the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    offset: u64,
    body: HunkBody,
}

impl Hunk {
    /// Literal hunk. The payload must fit the 16-bit length field and must
    /// not be empty (length 0 is reserved for RLE).
    pub fn literal(offset: u64, bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > MAX_HUNK_LEN {
            return Err(PatchError::InvalidHunk { len: bytes.len() });
        }
        Ok(Self::new(offset, HunkBody::Literal(bytes)))
    }

    /// Run-length hunk. `count == 0` yields the no-op sentinel.
    pub fn rle(offset: u64, count: u16, value: u8) -> Self {
        Self::new(offset, HunkBody::Rle { count, value })
    }

    pub(super) fn new(offset: u64, body: HunkBody) -> Self {
        Self { offset, body }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn body(&self) -> &HunkBody {
        &self.body
    }

    /// The wire `length` field: 0 for RLE hunks.
    pub fn length(&self) -> u16 {
        match &self.body {
            HunkBody::Literal(bytes) => bytes.len() as u16,
            HunkBody::Rle { .. } => 0,
        }
    }

    /// The wire `count` field: 0 for literal hunks.
    pub fn count(&self) -> u16 {
        match self.body {
            HunkBody::Literal(_) => 0,
            HunkBody::Rle { count, .. } => count,
        }
    }

    /// Literal bytes, or the single RLE byte.
    pub fn payload(&self) -> &[u8] {
        match &self.body {
            HunkBody::Literal(bytes) => bytes,
            HunkBody::Rle { value, .. } => std::slice::from_ref(value),
        }
    }

    pub fn is_rle(&self) -> bool {
        matches!(self.body, HunkBody::Rle { .. })
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.body, HunkBody::Rle { count: 0, .. })
    }

    pub fn is_above_ceiling(&self) -> bool {
        self.offset > MAX_OFFSET
    }

    /// Number of destination bytes this hunk covers.
    pub fn span(&self) -> u64 {
        match self.body {
            HunkBody::Literal(ref bytes) => bytes.len() as u64,
            HunkBody::Rle { count, .. } => count as u64,
        }
    }

    /// Line written to the hunk log sink.
    pub fn log_line(&self) -> String {
        format!("Offset: {:X}\tSize: {:X}", self.offset, self.payload().len())
    }

    // -----------------------------------------------------------------------
    // Wire codec
    // -----------------------------------------------------------------------

    /// Serialize onto `out`. Returns `Ok(false)` when the hunk was skipped:
    /// no-op hunks always are, above-ceiling hunks are under
    /// `OverflowPolicy::Skip`.
    pub fn write_ips<S: Read + Write + Seek>(
        &self,
        out: &mut ByteStream<S>,
        policy: OverflowPolicy,
    ) -> Result<bool> {
        if self.is_noop() {
            log::debug!("skipping no-op hunk at {:#X}", self.offset);
            return Ok(false);
        }
        if self.is_above_ceiling() {
            match policy {
                OverflowPolicy::Skip => {
                    log::warn!(
                        "hunk at {:#X} is past the 24-bit address ceiling, skipping",
                        self.offset
                    );
                    return Ok(false);
                }
                OverflowPolicy::Fail => {
                    return Err(PatchError::AddressSpaceOverflow {
                        offset: self.offset,
                    });
                }
            }
        }

        out.write_u24_be(self.offset as u32)?;
        out.write_u16_be(self.length())?;
        match &self.body {
            HunkBody::Rle { count, value } => {
                out.write_u16_be(*count)?;
                out.write_u8(*value)?;
            }
            HunkBody::Literal(bytes) => out.write_bytes(bytes)?,
        }
        Ok(true)
    }

    /// Parse one hunk. Offsets are not checked against anything here.
    pub fn read_ips<S: Read + Write + Seek>(input: &mut ByteStream<S>) -> Result<Self> {
        let offset = input.read_u24_be()?;
        Self::read_ips_body(offset, input)
    }

    /// Parse the rest of a hunk whose offset field was already consumed.
    pub fn read_ips_body<S: Read + Write + Seek>(
        offset: u32,
        input: &mut ByteStream<S>,
    ) -> Result<Self> {
        let length = input.read_u16_be()?;
        let body = if length == 0 {
            let count = input.read_u16_be()?;
            let value = input.read_u8()?;
            HunkBody::Rle { count, value }
        } else {
            HunkBody::Literal(input.read_bytes(length as usize)?)
        };
        Ok(Self::new(offset as u64, body))
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hunk({:#X}, {:#X}, {:#X}, ",
            self.offset,
            self.length(),
            self.count()
        )?;
        match &self.body {
            HunkBody::Rle { value, .. } => write!(f, "{value:#X}")?,
            HunkBody::Literal(bytes) => {
                f.write_str("{")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{b:#X}")?;
                }
                f.write_str("}")?;
            }
        }
        f.write_str(")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

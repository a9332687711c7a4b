// IPS magic header and optional end-of-patch trailer.

use std::io::{Read, Seek, Write};

use crate::error::{PatchError, Result};
use crate::stream::ByteStream;

/// Leading bytes of every IPS patch: `PATCH`.
pub const IPS_MAGIC: [u8; 5] = [0x50, 0x41, 0x54, 0x43, 0x48];

/// Trailer many IPS tools expect after the last hunk: `EOF`.
pub const EOF_MARKER: [u8; 3] = [0x45, 0x4F, 0x46];

/// `EOF_MARKER` as a 24-bit offset.
pub const EOF_MARKER_OFFSET: u32 = 0x45_4F46;

pub fn write_header<S: Read + Write + Seek>(out: &mut ByteStream<S>) -> Result<()> {
    out.write_bytes(&IPS_MAGIC)
}

/// Consume and verify the magic. A stream too short to hold it is rejected
/// the same way as a mismatching one.
pub fn read_header<S: Read + Write + Seek>(input: &mut ByteStream<S>) -> Result<()> {
    if input.size().saturating_sub(input.tell()) < IPS_MAGIC.len() as u64 {
        return Err(PatchError::InvalidPatchHeader);
    }
    let magic = input.read_bytes(IPS_MAGIC.len())?;
    if magic != IPS_MAGIC {
        return Err(PatchError::InvalidPatchHeader);
    }
    Ok(())
}

pub fn write_eof_marker<S: Read + Write + Seek>(out: &mut ByteStream<S>) -> Result<()> {
    out.write_bytes(&EOF_MARKER)
}

/// True when `offset` was the `EOF` trailer: the marker value with nothing
/// after it. A real hunk at that offset always carries at least a length.
pub fn is_eof_marker<S: Read + Write + Seek>(offset: u32, input: &ByteStream<S>) -> bool {
    offset == EOF_MARKER_OFFSET && input.is_end()
}

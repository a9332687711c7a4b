// Error taxonomy for patch creation and application.
//
// Every condition here is fatal for the run that hits it, except
// `AddressSpaceOverflow`, which the writer only raises under
// `OverflowPolicy::Fail`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the stream, codec, diff and apply layers.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A file could not be opened in the requested mode.
    #[error("cannot open '{}': {source}", path.display())]
    CannotOpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A read needed more bytes than the stream holds.
    #[error("unexpected end of stream at offset {offset:#X}")]
    UnexpectedEndOfStream { offset: u64 },

    /// The first five bytes are not `PATCH`.
    #[error("not a valid IPS patch: missing PATCH header")]
    InvalidPatchHeader,

    /// The output path names one of the input files.
    #[error("output '{}' is also an input file", path.display())]
    OutputIsInput { path: PathBuf },

    /// A hunk starts at or runs past the end of the destination.
    #[error("hunk at offset {offset:#X} does not fit in destination of size {size:#X}")]
    OffsetOutOfRange { offset: u64, size: u64 },

    /// A hunk offset does not fit the 3-byte IPS offset field.
    #[error("hunk offset {offset:#X} exceeds the 24-bit address ceiling 0xFFFFFF")]
    AddressSpaceOverflow { offset: u64 },

    /// A literal payload that cannot be expressed by the 16-bit length field.
    #[error("literal hunk payload must hold 1..=65535 bytes, got {len}")]
    InvalidHunk { len: usize },

    /// Underlying I/O fault.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PatchError>;

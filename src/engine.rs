// In-memory patch engine.
//
// Thin wrappers that run the stream-based create/apply pipelines over
// byte slices, for callers that already hold both files in memory.

use crate::error::Result;
use crate::ips::apply::{self, ApplyOptions};
use crate::ips::create::{self, CreateOptions};
use crate::stream::{ByteStream, OpenMode};

/// Build an IPS patch turning `source` into `target`.
pub fn create_patch(source: &[u8], target: &[u8], opts: &CreateOptions) -> Result<Vec<u8>> {
    let mut source = ByteStream::from_bytes(source.to_vec(), OpenMode::Read);
    let mut target = ByteStream::from_bytes(target.to_vec(), OpenMode::Read);
    let mut out = ByteStream::from_bytes(Vec::new(), OpenMode::Write);

    create::create_all(&mut source, &mut target, &mut out, opts, None)?;
    out.into_bytes()
}

/// Apply `patch` to a copy of `data` and return the result.
///
/// The output always has the length of `data`; hunks can only overwrite.
pub fn apply_patch(patch: &[u8], data: &[u8], opts: &ApplyOptions) -> Result<Vec<u8>> {
    let mut patch = ByteStream::from_bytes(patch.to_vec(), OpenMode::Read);
    let mut dest = ByteStream::from_bytes(data.to_vec(), OpenMode::ReadWrite);

    apply::apply_all(&mut patch, &mut dest, opts, None)?;
    dest.into_bytes()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// File-level helpers for patch creation and application.
//
// Provides `create_patch_file()` and `apply_patch_file()`, which open the
// involved files as `ByteStream`s, run the IPS pipelines and report sizes
// and hunk counts. Streams are flushed and closed on every exit path.

use std::io::Write;
use std::path::Path;

use crate::error::{PatchError, Result};
use crate::ips::apply::{self, ApplyOptions, ApplySummary};
use crate::ips::create::{self, CreateOptions, CreateSummary};
use crate::stream::{ByteStream, OpenMode};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `create_patch_file()`.
#[derive(Debug, Clone)]
pub struct CreateStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Target file size in bytes.
    pub target_size: u64,
    /// Patch output size in bytes.
    pub patch_size: u64,
    /// Hunk counters.
    pub summary: CreateSummary,
}

/// Statistics returned by `apply_patch_file()`.
#[derive(Debug, Clone)]
pub struct ApplyStats {
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Patched file size in bytes (unchanged by patching).
    pub file_size: u64,
    /// Hunk counters.
    pub summary: ApplySummary,
}

// ---------------------------------------------------------------------------
// create_patch_file
// ---------------------------------------------------------------------------

/// Diff `source_path` against `target_path` and write an IPS patch to
/// `patch_path`, creating or truncating it.
pub fn create_patch_file(
    source_path: &Path,
    target_path: &Path,
    patch_path: &Path,
    opts: &CreateOptions,
    log: Option<&mut dyn Write>,
) -> Result<CreateStats> {
    let mut source = ByteStream::open(source_path, OpenMode::Read)?;
    let mut target = ByteStream::open(target_path, OpenMode::Read)?;
    // Opening the output truncates it, so it must not be either input.
    if same_file(patch_path, source_path) || same_file(patch_path, target_path) {
        return Err(PatchError::OutputIsInput {
            path: patch_path.to_path_buf(),
        });
    }
    let mut output = ByteStream::open(patch_path, OpenMode::Write)?;

    let summary = create::create_all(&mut source, &mut target, &mut output, opts, log)?;
    let patch_size = output.tell();
    output.close()?;

    Ok(CreateStats {
        source_size: source.size(),
        target_size: target.size(),
        patch_size,
        summary,
    })
}

// ---------------------------------------------------------------------------
// apply_patch_file
// ---------------------------------------------------------------------------

/// Apply the IPS patch at `patch_path` to `file_path` in place.
///
/// On error the file keeps every hunk applied before the failure.
pub fn apply_patch_file(
    patch_path: &Path,
    file_path: &Path,
    opts: &ApplyOptions,
    log: Option<&mut dyn Write>,
) -> Result<ApplyStats> {
    let mut patch = ByteStream::open(patch_path, OpenMode::Read)?;
    if same_file(patch_path, file_path) {
        return Err(PatchError::OutputIsInput {
            path: file_path.to_path_buf(),
        });
    }
    let mut file = ByteStream::open(file_path, OpenMode::ReadWrite)?;

    let summary = apply::apply_all(&mut patch, &mut file, opts, log)?;
    let stats = ApplyStats {
        patch_size: patch.size(),
        file_size: file.size(),
        summary,
    };
    file.close()?;

    Ok(stats)
}

/// True when both paths resolve to the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

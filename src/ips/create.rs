// Patch creation: header, then every hunk the diff engine finds.

use std::io::{Read, Seek, Write};

use super::diff::DiffEngine;
use super::header;
use super::hunk::OverflowPolicy;
use crate::error::Result;
use crate::stream::ByteStream;

/// Options for patch creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateOptions {
    /// Handling of hunks past the 24-bit address ceiling.
    pub overflow: OverflowPolicy,
    /// Append the `EOF` trailer expected by most third-party IPS tools.
    /// Off by default: patches end at physical end of file.
    pub eof_marker: bool,
}

/// Counters for one `create_all` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateSummary {
    /// Hunks produced by the diff.
    pub hunks: u64,
    /// Hunks serialized into the patch.
    pub written: u64,
    /// Hunks dropped for being past the 24-bit ceiling.
    pub skipped: u64,
}

/// Diff `source` against `target` and write the IPS patch to `out`.
///
/// `log`, when given, receives one `Hunk::log_line` per produced hunk.
pub fn create_all<S, T, O>(
    source: &mut ByteStream<S>,
    target: &mut ByteStream<T>,
    out: &mut ByteStream<O>,
    opts: &CreateOptions,
    mut log: Option<&mut dyn Write>,
) -> Result<CreateSummary>
where
    S: Read + Write + Seek,
    T: Read + Write + Seek,
    O: Read + Write + Seek,
{
    if source.size() != target.size() {
        log::warn!(
            "source is {} bytes but target is {}; only the first {} are compared",
            source.size(),
            target.size(),
            source.size().min(target.size())
        );
    }

    let mut summary = CreateSummary::default();
    header::write_header(out)?;

    let mut diff = DiffEngine::new(source, target);
    while let Some(hunk) = diff.next_hunk()? {
        summary.hunks += 1;
        if hunk.write_ips(out, opts.overflow)? {
            summary.written += 1;
        } else {
            summary.skipped += 1;
        }
        if let Some(sink) = log.as_deref_mut() {
            writeln!(sink, "{}", hunk.log_line())?;
        }
    }

    if opts.eof_marker {
        header::write_eof_marker(out)?;
    }
    out.flush()?;

    log::info!(
        "created patch with {} hunks ({} skipped)",
        summary.written,
        summary.skipped
    );
    Ok(summary)
}

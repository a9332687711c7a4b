// IPS patch reading and in-place application.
//
// State progression: verify the header, then repeatedly parse one hunk and
// apply it until the patch stream is exhausted. Any failed precondition
// aborts the run; hunks applied before it stay applied.

use std::io::{Read, Seek, Write};

use super::header;
use super::hunk::{Hunk, HunkBody};
use crate::error::{PatchError, Result};
use crate::stream::ByteStream;

/// Options for patch application.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Honor hunks whose offset is past 0xFFFFFF instead of skipping them.
    pub allow_above_u24: bool,
}

/// Outcome of applying one hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Written,
    NoOp,
    SkippedAboveCeiling,
}

/// Counters for one `apply_all` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Hunks parsed from the patch.
    pub hunks: u64,
    /// Hunks written to the destination.
    pub written: u64,
    /// No-op hunks.
    pub noops: u64,
    /// Hunks skipped for being past the 24-bit ceiling.
    pub skipped: u64,
    /// Destination bytes covered by written hunks.
    pub bytes_written: u64,
}

// ---------------------------------------------------------------------------
// Patch reader
// ---------------------------------------------------------------------------

/// Iterates the hunks of an IPS patch stream.
///
/// Construction consumes and checks the `PATCH` header. Iteration stops at
/// physical end of stream, or at a trailing `EOF` record.
pub struct PatchReader<'a, S: Read + Write + Seek> {
    input: &'a mut ByteStream<S>,
    done: bool,
}

impl<'a, S: Read + Write + Seek> PatchReader<'a, S> {
    pub fn new(input: &'a mut ByteStream<S>) -> Result<Self> {
        header::read_header(input)?;
        Ok(Self { input, done: false })
    }

    pub fn next_hunk(&mut self) -> Result<Option<Hunk>> {
        if self.done || self.input.is_end() {
            self.done = true;
            return Ok(None);
        }
        let offset = self.input.read_u24_be()?;
        if header::is_eof_marker(offset, self.input) {
            log::debug!("reached EOF trailer");
            self.done = true;
            return Ok(None);
        }
        Hunk::read_ips_body(offset, self.input).map(Some)
    }
}

impl<S: Read + Write + Seek> Iterator for PatchReader<'_, S> {
    type Item = Result<Hunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.next_hunk().transpose();
        if matches!(item, Some(Err(_))) {
            self.done = true;
        }
        item
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

impl Hunk {
    /// Write this hunk onto `dest`.
    ///
    /// Hunks may only overwrite bytes the destination already has: an offset
    /// at or past `dest.size()`, or a payload running past it, is fatal and
    /// nothing of the hunk is written.
    pub fn apply_to<S: Read + Write + Seek>(
        &self,
        dest: &mut ByteStream<S>,
        opts: &ApplyOptions,
    ) -> Result<Applied> {
        if self.offset() >= dest.size() || self.offset() + self.span() > dest.size() {
            return Err(PatchError::OffsetOutOfRange {
                offset: self.offset(),
                size: dest.size(),
            });
        }
        if self.is_noop() {
            return Ok(Applied::NoOp);
        }
        if self.is_above_ceiling() && !opts.allow_above_u24 {
            log::warn!(
                "hunk at {:#X} is past 0xFFFFFF, skipping (enable above-u24 offsets to apply)",
                self.offset()
            );
            return Ok(Applied::SkippedAboveCeiling);
        }

        dest.seek(self.offset())?;
        match self.body() {
            HunkBody::Literal(bytes) => dest.write_bytes(bytes)?,
            HunkBody::Rle { count, value } => dest.write_repeated(*value, *count as usize)?,
        }
        Ok(Applied::Written)
    }
}

/// Apply every hunk of `patch` to `dest`.
///
/// `log`, when given, receives one `Hunk::log_line` per parsed hunk.
pub fn apply_all<P, D>(
    patch: &mut ByteStream<P>,
    dest: &mut ByteStream<D>,
    opts: &ApplyOptions,
    mut log: Option<&mut dyn Write>,
) -> Result<ApplySummary>
where
    P: Read + Write + Seek,
    D: Read + Write + Seek,
{
    let mut summary = ApplySummary::default();
    let mut reader = PatchReader::new(patch)?;

    while let Some(hunk) = reader.next_hunk()? {
        summary.hunks += 1;
        match hunk.apply_to(dest, opts)? {
            Applied::Written => {
                summary.written += 1;
                summary.bytes_written += hunk.span();
            }
            Applied::NoOp => summary.noops += 1,
            Applied::SkippedAboveCeiling => summary.skipped += 1,
        }
        log::debug!("apply: {hunk}");
        if let Some(sink) = log.as_deref_mut() {
            writeln!(sink, "{}", hunk.log_line())?;
        }
    }

    dest.flush()?;
    log::info!(
        "applied {} of {} hunks ({} no-op, {} skipped)",
        summary.written,
        summary.hunks,
        summary.noops,
        summary.skipped
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ips::MAX_OFFSET;
    use crate::stream::OpenMode;
    use std::io::Cursor;

    fn patch_stream(body: &[u8]) -> ByteStream<Cursor<Vec<u8>>> {
        let mut bytes = b"PATCH".to_vec();
        bytes.extend_from_slice(body);
        ByteStream::from_bytes(bytes, OpenMode::Read)
    }

    fn apply(
        body: &[u8],
        dest: Vec<u8>,
        opts: ApplyOptions,
    ) -> (Result<ApplySummary>, Vec<u8>) {
        let mut patch = patch_stream(body);
        let mut dest = ByteStream::from_bytes(dest, OpenMode::ReadWrite);
        let result = apply_all(&mut patch, &mut dest, &opts, None);
        (result, dest.into_bytes().unwrap())
    }

    #[test]
    fn applies_literal_and_rle() {
        let body = [
            0x00, 0x00, 0x01, 0x00, 0x02, 0xAB, 0xCD, // literal @1
            0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x03, 0xEE, // rle @4 x3
        ];
        let (result, out) = apply(&body, vec![0; 8], ApplyOptions::default());
        let summary = result.unwrap();
        assert_eq!(out, vec![0, 0xAB, 0xCD, 0, 0xEE, 0xEE, 0xEE, 0]);
        assert_eq!(summary.hunks, 2);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.bytes_written, 5);
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let (result, out) = apply(&[], vec![1, 2, 3], ApplyOptions::default());
        assert_eq!(result.unwrap(), ApplySummary::default());
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_bad_header() {
        let mut patch = ByteStream::from_bytes(b"PATCJ\x00\x00\x00".to_vec(), OpenMode::Read);
        let mut dest = ByteStream::from_bytes(vec![0; 4], OpenMode::ReadWrite);
        assert!(matches!(
            apply_all(&mut patch, &mut dest, &ApplyOptions::default(), None),
            Err(PatchError::InvalidPatchHeader)
        ));
    }

    #[test]
    fn offset_at_destination_size_is_fatal_and_writes_nothing() {
        let body = [
            0x00, 0x00, 0x00, 0x00, 0x01, 0x11, // literal @0
            0x00, 0x00, 0x04, 0x00, 0x01, 0x22, // literal @4, dest is 4 bytes
        ];
        let (result, out) = apply(&body, vec![0; 4], ApplyOptions::default());
        assert!(matches!(
            result,
            Err(PatchError::OffsetOutOfRange { offset: 4, size: 4 })
        ));
        // Earlier hunk stays applied, the failing one left no trace.
        assert_eq!(out, vec![0x11, 0, 0, 0]);
    }

    #[test]
    fn literal_tail_past_destination_is_fatal() {
        // 4 literal bytes at offset 3 of a 4-byte destination.
        let body = [0x00, 0x00, 0x03, 0x00, 0x04, 0xAA, 0xBB, 0xCC, 0xDD];
        let (result, out) = apply(&body, vec![0; 4], ApplyOptions::default());
        assert!(matches!(
            result,
            Err(PatchError::OffsetOutOfRange { offset: 3, size: 4 })
        ));
        assert_eq!(out, vec![0; 4]);
    }

    #[test]
    fn rle_tail_past_destination_is_fatal() {
        // 100 x 0xEE at offset 3 of a 4-byte destination.
        let body = [0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x64, 0xEE];
        let (result, out) = apply(&body, vec![0; 4], ApplyOptions::default());
        assert!(matches!(
            result,
            Err(PatchError::OffsetOutOfRange { offset: 3, size: 4 })
        ));
        assert_eq!(out, vec![0; 4]);
    }

    #[test]
    fn hunk_ending_exactly_at_destination_end_is_written() {
        let body = [0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0xEE];
        let (result, out) = apply(&body, vec![0; 4], ApplyOptions::default());
        assert_eq!(result.unwrap().written, 1);
        assert_eq!(out, vec![0, 0, 0xEE, 0xEE]);
    }

    #[test]
    fn noop_hunks_are_skipped() {
        let body = [0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x99];
        let (result, out) = apply(&body, vec![0; 4], ApplyOptions::default());
        let summary = result.unwrap();
        assert_eq!(summary.noops, 1);
        assert_eq!(summary.written, 0);
        assert_eq!(out, vec![0; 4]);
    }

    #[test]
    fn above_ceiling_hunks_follow_the_flag() {
        let size = MAX_OFFSET as usize + 2;
        let hunk = Hunk::literal(MAX_OFFSET + 1, vec![0x5A]).unwrap();

        let mut dest = ByteStream::from_bytes(vec![0; size], OpenMode::ReadWrite);
        let outcome = hunk.apply_to(&mut dest, &ApplyOptions::default()).unwrap();
        assert_eq!(outcome, Applied::SkippedAboveCeiling);
        let out = dest.into_bytes().unwrap();
        assert_eq!(out[size - 1], 0);

        let mut dest = ByteStream::from_bytes(out, OpenMode::ReadWrite);
        let opts = ApplyOptions {
            allow_above_u24: true,
        };
        assert_eq!(hunk.apply_to(&mut dest, &opts).unwrap(), Applied::Written);
        let out = dest.into_bytes().unwrap();
        assert_eq!(out[size - 1], 0x5A);
        assert_eq!(out.len(), size);
    }

    #[test]
    fn truncated_hunk_is_fatal() {
        let (result, _) = apply(&[0x00, 0x00, 0x01, 0x00], vec![0; 4], ApplyOptions::default());
        assert!(matches!(
            result,
            Err(PatchError::UnexpectedEndOfStream { .. })
        ));
    }

    #[test]
    fn trailing_eof_record_ends_the_patch() {
        let body = [0x00, 0x00, 0x02, 0x00, 0x01, 0x7F, b'E', b'O', b'F'];
        let (result, out) = apply(&body, vec![0; 4], ApplyOptions::default());
        assert_eq!(result.unwrap().hunks, 1);
        assert_eq!(out, vec![0, 0, 0x7F, 0]);
    }

    #[test]
    fn log_sink_gets_one_line_per_hunk() {
        let body = [
            0x00, 0x00, 0x01, 0x00, 0x02, 0xAB, 0xCD, //
            0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0xEE,
        ];
        let mut patch = patch_stream(&body);
        let mut dest = ByteStream::from_bytes(vec![0; 4], OpenMode::ReadWrite);
        let mut log: Vec<u8> = Vec::new();
        apply_all(
            &mut patch,
            &mut dest,
            &ApplyOptions::default(),
            Some(&mut log),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(log).unwrap(),
            "Offset: 1\tSize: 2\nOffset: 3\tSize: 1\n"
        );
    }

    #[test]
    fn reader_iterates_hunks() {
        let body = [
            0x00, 0x00, 0x01, 0x00, 0x01, 0xAB, //
            0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0xCD,
        ];
        let mut patch = patch_stream(&body);
        let hunks: Vec<Hunk> = PatchReader::new(&mut patch)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            hunks,
            vec![Hunk::literal(1, vec![0xAB]).unwrap(), Hunk::rle(2, 2, 0xCD)]
        );
    }
}

// Big-endian byte stream over a random-access store.
//
// `ByteStream` keeps one logical cursor shared by reads and writes, a read
// window and a coalesced write buffer (64 KiB each). The total size is
// captured once when the stream is opened and never revalidated; reads are
// bounded by that cached size.
//
// Multi-byte integers are composed from single-byte reads, most-significant
// byte first, which is the whole of the IPS integer encoding.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{PatchError, Result};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// How the underlying file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, reads only.
    Read,
    /// Created or truncated, writes only.
    Write,
    /// Existing file, reads and in-place writes.
    ReadWrite,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// Positioned big-endian reader/writer over one store.
///
/// Pending writes are flushed before any read that needs to refill the
/// window, on [`flush`](Self::flush) and [`close`](Self::close), and when the
/// stream is dropped.
pub struct ByteStream<S: Read + Write + Seek> {
    inner: S,
    mode: OpenMode,
    size: u64,
    pos: u64,
    read_buf: Vec<u8>,
    read_base: u64,
    write_buf: Vec<u8>,
    write_base: u64,
}

impl ByteStream<File> {
    /// Open `path` in `mode`. The cursor starts at 0 and the size is the
    /// file length at this moment.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let cannot_open = |source: io::Error| PatchError::CannotOpenFile {
            path: path.to_path_buf(),
            source,
        };

        let file = match mode {
            OpenMode::Read => File::open(path),
            OpenMode::Write => File::create(path),
            OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(path),
        }
        .map_err(cannot_open)?;
        let size = file.metadata().map_err(cannot_open)?.len();

        log::debug!("opened {} ({mode:?}, {size} bytes)", path.display());
        Ok(Self::with_size(file, mode, size))
    }
}

impl ByteStream<Cursor<Vec<u8>>> {
    /// In-memory stream over `bytes`.
    pub fn from_bytes(bytes: Vec<u8>, mode: OpenMode) -> Self {
        let size = bytes.len() as u64;
        Self::with_size(Cursor::new(bytes), mode, size)
    }

    /// Flush and hand back the buffer.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.flush()?;
        Ok(std::mem::take(&mut self.inner).into_inner())
    }
}

impl<S: Read + Write + Seek> ByteStream<S> {
    /// Wrap an arbitrary store. The size is taken by seeking to its end.
    pub fn new(mut inner: S, mode: OpenMode) -> Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self::with_size(inner, mode, size))
    }

    fn with_size(inner: S, mode: OpenMode, size: u64) -> Self {
        Self {
            inner,
            mode,
            size,
            pos: 0,
            read_buf: Vec::new(),
            read_base: 0,
            write_buf: Vec::new(),
            write_base: 0,
        }
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Size captured at open.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current cursor.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// True once the cursor has consumed the final byte.
    pub fn is_end(&self) -> bool {
        self.pos >= self.size
    }

    /// Move the cursor. Read-only streams cannot move past their size;
    /// writable ones can, and the gap is zero-filled by the store on the
    /// next write.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if !self.mode.is_writable() && offset > self.size {
            return Err(PatchError::UnexpectedEndOfStream { offset });
        }
        self.pos = offset;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos >= self.size {
            return Err(PatchError::UnexpectedEndOfStream { offset: self.pos });
        }
        if !self.window_holds(self.pos) {
            self.fill_window()?;
        }
        let byte = self.read_buf[(self.pos - self.read_base) as usize];
        self.pos += 1;
        Ok(byte)
    }

    /// Read exactly `len` bytes, failing with `UnexpectedEndOfStream` if the
    /// stream runs out first.
    ///
    /// The bound is checked up front, so a failed read leaves the cursor
    /// unchanged. The reported offset is `size`.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.pos.saturating_add(len as u64) > self.size {
            return Err(PatchError::UnexpectedEndOfStream {
                offset: self.size.max(self.pos),
            });
        }

        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            if !self.window_holds(self.pos) {
                self.fill_window()?;
            }
            let start = (self.pos - self.read_base) as usize;
            let take = (len - out.len()).min(self.read_buf.len() - start);
            out.extend_from_slice(&self.read_buf[start..start + take]);
            self.pos += take as u64;
        }
        Ok(out)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let hi = self.read_u8()? as u16;
        let lo = self.read_u8()? as u16;
        Ok((hi << 8) | lo)
    }

    /// 24-bit value promoted to `u32`.
    pub fn read_u24_be(&mut self) -> Result<u32> {
        let hi = self.read_u16_be()? as u32;
        let lo = self.read_u8()? as u32;
        Ok((hi << 8) | lo)
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let hi = self.read_u16_be()? as u32;
        let lo = self.read_u16_be()? as u32;
        Ok((hi << 16) | lo)
    }

    fn window_holds(&self, pos: u64) -> bool {
        pos >= self.read_base && pos < self.read_base + self.read_buf.len() as u64
    }

    // Caller guarantees `pos < size`.
    fn fill_window(&mut self) -> Result<()> {
        self.flush_writes()?;

        let want = (self.size - self.pos).min(BUF_SIZE as u64) as usize;
        self.read_buf.resize(want, 0);
        self.inner.seek(SeekFrom::Start(self.pos))?;

        if let Err(e) = self.inner.read_exact(&mut self.read_buf) {
            self.read_buf.clear();
            // The store shrank underneath us since open.
            return Err(if e.kind() == ErrorKind::UnexpectedEof {
                PatchError::UnexpectedEndOfStream { offset: self.pos }
            } else {
                e.into()
            });
        }
        self.read_base = self.pos;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    pub fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.prepare_write()?;
        self.write_buf.extend_from_slice(bytes);
        self.pos += bytes.len() as u64;
        self.flush_if_full()
    }

    /// Write `byte` `count` times.
    pub fn write_repeated(&mut self, byte: u8, count: usize) -> Result<()> {
        self.prepare_write()?;
        let len = self.write_buf.len();
        self.write_buf.resize(len + count, byte);
        self.pos += count as u64;
        self.flush_if_full()
    }

    pub fn write_u16_be(&mut self, value: u16) -> Result<()> {
        self.write_u8((value >> 8) as u8)?;
        self.write_u8(value as u8)
    }

    /// Emits the low 24 bits of `value`.
    pub fn write_u24_be(&mut self, value: u32) -> Result<()> {
        self.write_u16_be((value >> 8) as u16)?;
        self.write_u8(value as u8)
    }

    pub fn write_u32_be(&mut self, value: u32) -> Result<()> {
        self.write_u16_be((value >> 16) as u16)?;
        self.write_u16_be(value as u16)
    }

    fn prepare_write(&mut self) -> Result<()> {
        if !self.mode.is_writable() {
            return Err(
                io::Error::new(ErrorKind::PermissionDenied, "stream is opened read-only").into(),
            );
        }
        if !self.write_buf.is_empty() && self.write_base + self.write_buf.len() as u64 != self.pos {
            self.flush_writes()?;
        }
        if self.write_buf.is_empty() {
            self.write_base = self.pos;
        }
        // Any cached window may now be stale.
        self.read_buf.clear();
        Ok(())
    }

    fn flush_if_full(&mut self) -> Result<()> {
        if self.write_buf.len() >= BUF_SIZE {
            self.flush_writes()?;
        }
        Ok(())
    }

    fn flush_writes(&mut self) -> Result<()> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        self.inner.seek(SeekFrom::Start(self.write_base))?;
        self.inner.write_all(&self.write_buf)?;
        self.write_buf.clear();
        Ok(())
    }

    /// Make every buffered write visible to other readers of the store.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_writes()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flush, then release the store.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

impl<S: Read + Write + Seek> Drop for ByteStream<S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("failed to flush stream on close: {e}");
        }
    }
}

impl<S: Read + Write + Seek> fmt::Debug for ByteStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("mode", &self.mode)
            .field("size", &self.size)
            .field("pos", &self.pos)
            .field("pending_writes", &self.write_buf.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

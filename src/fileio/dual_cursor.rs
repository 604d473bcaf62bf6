use crate::error::{BspError, Result};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Which of the two independent cursors an operation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Read = 0,
    Write = 1,
}

impl CursorKind {
    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    position: u64,
    saved: u64,
}

/// A file opened for simultaneous reading and writing through two cursors
///
/// Each cursor has exactly one save slot. [`set_cursor`](Self::set_cursor)
/// stores the current position in that slot before moving, and
/// [`revert_cursor`](Self::revert_cursor) restores it. Calling `set_cursor`
/// twice without a revert in between overwrites the first saved position;
/// the slot is not a stack. Prefer [`reposition`](Self::reposition), which
/// restores the cursor when the returned guard drops, on every exit path.
///
/// All transfers are element-sized and cursor-relative. A transfer that hits
/// end-of-file returns fewer bytes than requested; that is not an error.
pub struct DualCursorFile {
    file: File,
    path: PathBuf,
    size: u64,
    cursors: [Cursor; 2],
    transferred: [u64; 2],
}

impl DualCursorFile {
    /// Open an existing file for reading and writing
    ///
    /// The file is never truncated or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| BspError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let size = file.metadata()?.len();

        debug!(path = %path.display(), size, "opened file");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
            cursors: [Cursor::default(); 2],
            transferred: [0; 2],
        })
    }

    /// Path the file was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes, including anything appended through this handle
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current position of a cursor
    pub fn cursor(&self, kind: CursorKind) -> u64 {
        self.cursors[kind.slot()].position
    }

    pub fn read_cursor(&self) -> u64 {
        self.cursor(CursorKind::Read)
    }

    pub fn write_cursor(&self) -> u64 {
        self.cursor(CursorKind::Write)
    }

    /// Save the current position in the cursor's single save slot, then move it
    pub fn set_cursor(&mut self, kind: CursorKind, offset: u64) {
        let cursor = &mut self.cursors[kind.slot()];
        cursor.saved = cursor.position;
        cursor.position = offset;
    }

    /// Restore the position saved by the last [`set_cursor`](Self::set_cursor)
    pub fn revert_cursor(&mut self, kind: CursorKind) {
        let cursor = &mut self.cursors[kind.slot()];
        cursor.position = cursor.saved;
    }

    pub fn set_read_cursor(&mut self, offset: u64) {
        self.set_cursor(CursorKind::Read, offset);
    }

    pub fn set_write_cursor(&mut self, offset: u64) {
        self.set_cursor(CursorKind::Write, offset);
    }

    pub fn revert_read_cursor(&mut self) {
        self.revert_cursor(CursorKind::Read);
    }

    pub fn revert_write_cursor(&mut self) {
        self.revert_cursor(CursorKind::Write);
    }

    /// Move a cursor for the lifetime of the returned guard
    ///
    /// The previous position is restored when the guard drops. The cursor's
    /// save slot is left untouched, so this nests with `set_cursor`.
    pub fn reposition(&mut self, kind: CursorKind, offset: u64) -> Reposition<'_> {
        let restore = self.cursor(kind);
        self.cursors[kind.slot()].position = offset;
        Reposition {
            file: self,
            kind,
            restore,
        }
    }

    /// Lifetime total of bytes read through this handle
    pub fn bytes_read(&self) -> u64 {
        self.transferred[CursorKind::Read.slot()]
    }

    /// Lifetime total of bytes written through this handle
    pub fn bytes_written(&self) -> u64 {
        self.transferred[CursorKind::Write.slot()]
    }

    /// Read into `buf` starting `element_offset` elements past the read cursor
    ///
    /// The whole of `buf` is requested. Returns the number of bytes actually
    /// read, which is smaller than `buf.len()` at end-of-file. The element
    /// offset only positions this transfer: the read cursor and the lifetime
    /// read counter both advance by the bytes read.
    pub fn read(&mut self, element_size: usize, buf: &mut [u8], element_offset: u64) -> Result<usize> {
        let start = self.transfer_start(CursorKind::Read, element_size, element_offset);
        self.file.seek(SeekFrom::Start(start))?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if filled > 0 => {
                    warn!(error = %e, filled, requested = buf.len(), "read cut short");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.finish_transfer(CursorKind::Read, filled);
        trace!(start, requested = buf.len(), filled, "read");
        Ok(filled)
    }

    /// Write `buf` starting `element_offset` elements past the write cursor
    ///
    /// Returns the number of bytes actually written. As with [`read`](Self::read),
    /// the write cursor and the lifetime write counter advance by the bytes
    /// written, not by the element offset.
    pub fn write(&mut self, element_size: usize, buf: &[u8], element_offset: u64) -> Result<usize> {
        let start = self.transfer_start(CursorKind::Write, element_size, element_offset);
        self.file.seek(SeekFrom::Start(start))?;

        let mut written = 0;
        while written < buf.len() {
            match self.file.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if written > 0 => {
                    warn!(error = %e, written, requested = buf.len(), "write cut short");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.finish_transfer(CursorKind::Write, written);
        self.size = self.size.max(start.saturating_add(written as u64));
        trace!(start, requested = buf.len(), written, "write");
        Ok(written)
    }

    /// Flush written data to the operating system and the device
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn transfer_start(&self, kind: CursorKind, element_size: usize, element_offset: u64) -> u64 {
        let skip = element_offset.saturating_mul(element_size as u64);
        self.cursor(kind).saturating_add(skip)
    }

    fn finish_transfer(&mut self, kind: CursorKind, bytes: usize) {
        let cursor = &mut self.cursors[kind.slot()];
        cursor.position = cursor.position.saturating_add(bytes as u64);
        self.transferred[kind.slot()] += bytes as u64;
    }
}

impl std::fmt::Debug for DualCursorFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualCursorFile")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("read_cursor", &self.read_cursor())
            .field("write_cursor", &self.write_cursor())
            .finish()
    }
}

/// Guard returned by [`DualCursorFile::reposition`]
///
/// Dereferences to the file. Dropping it puts the cursor back where it was.
pub struct Reposition<'a> {
    file: &'a mut DualCursorFile,
    kind: CursorKind,
    restore: u64,
}

impl Deref for Reposition<'_> {
    type Target = DualCursorFile;

    fn deref(&self) -> &Self::Target {
        self.file
    }
}

impl DerefMut for Reposition<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.file
    }
}

impl Drop for Reposition<'_> {
    fn drop(&mut self) {
        self.file.cursors[self.kind.slot()].position = self.restore;
    }
}

use crate::config::BackupConfig;
use crate::error::{BspError, Result};
use crate::fileio::DualCursorFile;
use std::ffi::OsString;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Copy block size used when none is given
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Per-byte transform applied while copying: `(byte, index_in_block, block_index)`
pub type ByteTransform<'a> = &'a mut dyn FnMut(u8, usize, u64) -> u8;

/// Outcome of a backup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    /// The copy was written
    Copied(BackupReport),
    /// A backup already exists and overwriting was not requested; it is untouched
    AlreadyExists(PathBuf),
}

/// Details of a completed copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub path: PathBuf,
    pub bytes_copied: u64,
    pub blocks: u64,
    /// CRC32 of the bytes read from the source
    pub source_crc32: u32,
    /// CRC32 of the bytes written, after any transform
    pub crc32: u32,
}

/// Sibling path formed by appending `suffix` to `path`
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl DualCursorFile {
    /// Copy the whole file to `<path><suffix>` in `block_size` chunks
    ///
    /// The copy is staged in a temporary file next to the target and moved
    /// into place once complete. Without `overwrite`, an existing backup is
    /// reported as [`BackupStatus::AlreadyExists`] and left as it is. A
    /// suffix that resolves to the source path is rejected.
    pub fn backup(
        &self,
        suffix: &str,
        block_size: usize,
        overwrite: bool,
        mut transform: Option<ByteTransform<'_>>,
    ) -> Result<BackupStatus> {
        let target = backup_path(self.path(), suffix);
        if target == self.path() {
            return Err(BspError::BackupOntoSelf(target));
        }
        if !overwrite && target.exists() {
            debug!(target = %target.display(), "backup already exists");
            return Ok(BackupStatus::AlreadyExists(target));
        }

        let block_size = if block_size == 0 {
            DEFAULT_BLOCK_SIZE
        } else {
            block_size
        };
        let parent = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut source = File::open(self.path())?;
        let mut staging = NamedTempFile::new_in(parent)?;
        let mut buffer = vec![0u8; block_size];
        let mut source_crc = crc32fast::Hasher::new();
        let mut copy_crc = crc32fast::Hasher::new();
        let mut bytes_copied = 0u64;
        let mut blocks = 0u64;

        loop {
            let filled = fill_block(&mut source, &mut buffer)?;
            if filled == 0 {
                break;
            }

            let block = &mut buffer[..filled];
            source_crc.update(block);
            if let Some(transform) = transform.as_mut() {
                for (index, byte) in block.iter_mut().enumerate() {
                    *byte = transform(*byte, index, blocks);
                }
            }
            copy_crc.update(block);
            staging.write_all(block)?;

            bytes_copied += filled as u64;
            blocks += 1;
        }

        staging.as_file().sync_all()?;

        let persisted = if overwrite {
            staging.persist(&target)
        } else {
            staging.persist_noclobber(&target)
        };
        if let Err(err) = persisted {
            if err.error.kind() == ErrorKind::AlreadyExists {
                return Ok(BackupStatus::AlreadyExists(target));
            }
            return Err(err.error.into());
        }

        debug!(target = %target.display(), bytes_copied, blocks, "backup written");

        Ok(BackupStatus::Copied(BackupReport {
            path: target,
            bytes_copied,
            blocks,
            source_crc32: source_crc.finalize(),
            crc32: copy_crc.finalize(),
        }))
    }

    /// Back up using configured settings, verifying the copy when asked
    ///
    /// Verification re-reads the backup from disk and compares its CRC32
    /// with the source's.
    pub fn backup_with(&self, config: &BackupConfig) -> Result<BackupStatus> {
        let status = self.backup(&config.suffix, config.block_size, config.overwrite, None)?;

        if let BackupStatus::Copied(report) = &status {
            if config.verify {
                let actual = file_crc32(&report.path, config.block_size)?;
                if actual != report.source_crc32 {
                    return Err(BspError::BackupMismatch {
                        expected: report.source_crc32,
                        actual,
                    });
                }
            }
        }

        Ok(status)
    }
}

/// Read until `buffer` is full or the source is exhausted
fn fill_block<R: Read>(source: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn file_crc32(path: &Path, block_size: usize) -> Result<u32> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; block_size.max(1)];
    let mut hasher = crc32fast::Hasher::new();
    loop {
        let filled = fill_block(&mut file, &mut buffer)?;
        if filled == 0 {
            break;
        }
        hasher.update(&buffer[..filled]);
    }
    Ok(hasher.finalize())
}

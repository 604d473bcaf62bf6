use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for map file operations
pub type Result<T> = std::result::Result<T, BspError>;

/// Unified error type for all map file operations
///
/// Short reads and writes are not errors. Transfer methods report the number
/// of bytes actually moved and callers compare it with what they asked for.
#[derive(Debug, Error)]
pub enum BspError {
    // File errors
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Directory errors
    #[error("Unknown directory ident: {0:#010x}")]
    UnknownIdent(i32),

    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    #[error("Lump id {id} out of range (max {max})")]
    LumpOutOfRange { id: usize, max: usize },

    #[error("Invalid lump {id}: offset {offset}, length {length}")]
    InvalidLump { id: usize, offset: i32, length: i32 },

    // Record codec errors
    #[error("Truncated data at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    // Backup errors
    #[error("Backup target is the source file: {}", .0.display())]
    BackupOntoSelf(PathBuf),

    #[error("Backup verification failed: source crc {expected:08x}, copy crc {actual:08x}")]
    BackupMismatch { expected: u32, actual: u32 },

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BspError {
    /// Create a truncation error for a codec that ran out of bytes
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        BspError::Truncated {
            offset,
            needed,
            available,
        }
    }
}

impl From<toml::de::Error> for BspError {
    fn from(err: toml::de::Error) -> Self {
        BspError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BspError {
    fn from(err: toml::ser::Error) -> Self {
        BspError::Config(err.to_string())
    }
}

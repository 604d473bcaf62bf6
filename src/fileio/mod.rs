mod backup;
mod dual_cursor;

pub use backup::{
    backup_path, BackupReport, BackupStatus, ByteTransform, DEFAULT_BLOCK_SIZE,
};
pub use dual_cursor::{CursorKind, DualCursorFile, Reposition};

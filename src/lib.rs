//! bsplump-rs: lump-level read/write access to Source engine map files
//!
//! A map file starts with a fixed directory of 64 lumps. This library
//! provides:
//! - A dual-cursor file with independent read and write positions
//! - Directory parsing in either byte order and either slot layout
//! - Clamped, record-typed streaming and random access within one lump
//! - Directory patching when a write resizes a lump
//! - Game-lump and visibility header readers
//! - Whole-file backups
//!
//! # Example
//!
//! ```no_run
//! use bsplump_rs::{Brush, BspFile, LumpId};
//!
//! let mut bsp = BspFile::open("de_dust2.bsp")?;
//! bsp.select_lump::<Brush>(LumpId::Brushes)?;
//!
//! let mut brushes = vec![Brush::default(); 16];
//! let bytes = bsp.read_elements(&mut brushes, 0)?;
//! println!("read {} brushes", bytes / 12);
//! # Ok::<(), bsplump_rs::error::BspError>(())
//! ```

pub mod bsp;
pub mod config;
pub mod error;
pub mod fileio;

pub use bsp::{
    Brush, BrushSide, BspFile, BspWriter, ByteOrder, ClusterOffsets, CubemapSample, Directory,
    DirectoryLayout, Edge, GameLump, GameLumpDirectory, Ident, LumpDescriptor, LumpId, Model,
    Plane, Record, Selection, Vector, DIRECTORY_SIZE, HEADER_LUMPS,
};
pub use config::{AccessorConfig, BackupConfig};
pub use error::{BspError, Result};
pub use fileio::{BackupReport, BackupStatus, CursorKind, DualCursorFile};

use crate::bsp::format::{ByteOrder, Directory, DirectoryLayout, Ident, LumpDescriptor, DIRECTORY_SIZE};
use crate::bsp::game_lump::{GameLump, GameLumpDirectory};
use crate::bsp::lump_id::LumpId;
use crate::bsp::record::{encode_records, Record};
use crate::error::{BspError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Lump payloads start on 4-byte boundaries
const LUMP_ALIGNMENT: u64 = 4;

/// Writer for building map files from scratch
///
/// Payloads are appended in the order they are added. The directory is
/// written as a placeholder on create and rewritten by [`finalize`](Self::finalize).
pub struct BspWriter {
    writer: BufWriter<File>,
    directory: Directory,
    game_lumps: Vec<(GameLump, Vec<u8>)>,
    current_offset: u64,
}

impl BspWriter {
    /// Create (or truncate) a map file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| BspError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let mut writer = BufWriter::new(file);

        let directory = Directory::new(ByteOrder::Little, DirectoryLayout::Standard);
        directory.write_to(&mut writer)?;

        Ok(Self {
            writer,
            directory,
            game_lumps: Vec::new(),
            current_offset: DIRECTORY_SIZE as u64,
        })
    }

    pub fn with_format_version(mut self, version: i32) -> Self {
        self.directory.format_version = version;
        self
    }

    pub fn with_map_revision(mut self, revision: i32) -> Self {
        self.directory.map_revision = revision;
        self
    }

    /// Byte order of everything after the ident; set before adding records
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.directory.byte_order = order;
        self.directory.ident = Ident::magic_for(order);
        self
    }

    /// Store a raw ident value, e.g. to produce a file with an unrecognized magic
    pub fn with_ident(mut self, ident: i32) -> Self {
        self.directory.ident = ident;
        self
    }

    pub fn with_layout(mut self, layout: DirectoryLayout) -> Self {
        self.directory.layout = layout;
        self
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.directory.byte_order
    }

    /// Append a lump payload and point slot `id` at it
    pub fn add_lump(&mut self, id: impl Into<usize>, version: i32, data: &[u8]) -> Result<()> {
        let id = id.into();
        self.directory.lump(id)?;

        let offset = self.current_offset;
        self.append(data)?;
        self.directory.lumps[id] = LumpDescriptor::new(
            to_i32(offset, id)?,
            to_i32(data.len() as u64, id)?,
            version,
        );
        debug!(lump = id, offset, length = data.len(), "added lump");
        Ok(())
    }

    /// Append records encoded in the writer's byte order
    pub fn add_records<T: Record>(
        &mut self,
        id: impl Into<usize>,
        version: i32,
        records: &[T],
    ) -> Result<()> {
        let bytes = encode_records(records, self.directory.byte_order);
        self.add_lump(id, version, &bytes)
    }

    /// Queue a game lump; its payload is written on finalize, after the sub-directory
    pub fn add_game_lump(&mut self, id: i32, version: u16, flags: u16, data: &[u8]) {
        let entry = GameLump {
            id,
            flags,
            version,
            offset: 0,
            length: data.len() as i32,
        };
        self.game_lumps.push((entry, data.to_vec()));
    }

    /// Write queued game lumps, then rewrite the directory
    pub fn finalize(mut self) -> Result<()> {
        if !self.game_lumps.is_empty() {
            self.write_game_lumps()?;
        }

        self.writer.flush()?;
        let mut file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        self.directory.write_to(&mut file)?;
        file.flush()?;
        Ok(())
    }

    fn write_game_lumps(&mut self) -> Result<()> {
        let id = LumpId::GameLump.index();
        let directory_offset = self.current_offset;
        let directory_length = 4 + self.game_lumps.len() * GameLump::SIZE;

        let mut payload_offset = directory_offset + directory_length as u64;
        let mut entries = Vec::with_capacity(self.game_lumps.len());
        for (entry, data) in &self.game_lumps {
            let mut entry = *entry;
            entry.offset = to_i32(payload_offset, id)?;
            entry.length = to_i32(data.len() as u64, id)?;
            payload_offset += data.len() as u64;
            entries.push(entry);
        }

        let header = GameLumpDirectory::encode(&entries, self.directory.byte_order);
        self.writer.write_all(&header)?;
        let payloads: Vec<u8> = self
            .game_lumps
            .iter()
            .flat_map(|(_, data)| data.iter().copied())
            .collect();
        self.current_offset += header.len() as u64;
        self.append(&payloads)?;

        self.directory.lumps[id] = LumpDescriptor::new(
            to_i32(directory_offset, id)?,
            to_i32(directory_length as u64, id)?,
            0,
        );
        debug!(count = entries.len(), offset = directory_offset, "wrote game lumps");
        Ok(())
    }

    /// Write `data` at the current offset and pad to the lump alignment
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_offset += data.len() as u64;

        let padding = (LUMP_ALIGNMENT - self.current_offset % LUMP_ALIGNMENT) % LUMP_ALIGNMENT;
        if padding > 0 {
            self.writer.write_all(&[0u8; LUMP_ALIGNMENT as usize][..padding as usize])?;
            self.current_offset += padding;
        }
        Ok(())
    }
}

fn to_i32(value: u64, id: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| BspError::InvalidLump {
        id,
        offset: i32::MAX,
        length: i32::MAX,
    })
}

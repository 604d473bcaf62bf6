use crate::bsp::format::{ByteOrder, Directory, DirectoryLayout, Ident, LumpDescriptor, DIRECTORY_SIZE};
use crate::bsp::game_lump::{GameLump, GameLumpDirectory};
use crate::bsp::lump_id::LumpId;
use crate::bsp::record::{decode_records, FieldReader, FieldWriter, Record};
use crate::bsp::records::ClusterOffsets;
use crate::config::AccessorConfig;
use crate::error::{BspError, Result};
use crate::fileio::{BackupStatus, ByteTransform, CursorKind, DualCursorFile};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Bytes left to transfer in the selected lump, per direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Remaining {
    pub read: u64,
    pub write: u64,
}

/// The currently selected lump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub lump_id: usize,
    pub lump: LumpDescriptor,
    pub byte_offset: u64,
    pub byte_length: u64,
    /// Record size the lump was selected with
    pub element_size: usize,
    pub element_count: u64,
    pub remaining: Remaining,
    /// Free bytes after the lump that bulk writes may grow into
    pub growth_room: u64,
}

fn whole_elements(bytes: u64, size: usize) -> u64 {
    if size == 0 {
        0
    } else {
        bytes / size as u64
    }
}

/// Directory-aware access to the lumps of a map file
///
/// One lump is selected at a time. Bulk reads and writes stream through it
/// from the lump's start and are clamped so they never touch bytes outside
/// it. Requests past the end are cut short rather than rejected: every
/// transfer returns the number of bytes actually moved.
///
/// Random access ([`get_element`](Self::get_element),
/// [`set_element`](Self::set_element)) and the auxiliary readers reposition
/// the file cursors only for the duration of the call, so they can be
/// interleaved with bulk streaming.
///
/// Not thread-safe: all cursor and budget state lives in `&mut self`.
#[derive(Debug)]
pub struct BspFile {
    file: DualCursorFile,
    directory: Directory,
    game_lumps: GameLumpDirectory,
    selection: Selection,
    config: AccessorConfig,
}

impl BspFile {
    /// Open a map file with default settings
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &AccessorConfig::default())
    }

    /// Open a map file
    ///
    /// Loads the directory, parses the game-lump sub-directory and selects
    /// the configured default lump as raw bytes.
    pub fn open_with<P: AsRef<Path>>(path: P, config: &AccessorConfig) -> Result<Self> {
        let mut file = DualCursorFile::open(path)?;
        let file_size = file.size();

        let mut header = vec![0u8; DIRECTORY_SIZE];
        let read = {
            let mut at_start = file.reposition(CursorKind::Read, 0);
            at_start.read(1, &mut header, 0)?
        };
        let directory = Directory::from_bytes(&header[..read], config.layout, file_size)?;

        match directory.ident() {
            Ident::Unknown if config.strict_ident => {
                return Err(BspError::UnknownIdent(directory.ident));
            }
            Ident::Unknown => {
                warn!(
                    ident = %hex::encode(directory.ident.to_le_bytes()),
                    "unknown ident, decoding as little-endian"
                );
            }
            _ => {}
        }

        let game_lumps = read_game_lump_directory(&mut file, &directory)?;

        debug!(
            path = %file.path().display(),
            size = file_size,
            version = directory.format_version,
            revision = directory.map_revision,
            order = ?directory.byte_order,
            layout = ?directory.layout,
            game_lumps = game_lumps.entries().len(),
            "opened map"
        );

        let mut bsp = Self {
            file,
            directory,
            game_lumps,
            selection: Selection {
                lump_id: 0,
                lump: LumpDescriptor::default(),
                byte_offset: 0,
                byte_length: 0,
                element_size: 1,
                element_count: 0,
                remaining: Remaining::default(),
                growth_room: 0,
            },
            config: config.clone(),
        };
        bsp.select_lump::<u8>(config.default_lump)?;
        Ok(bsp)
    }

    /// Make `id` the selected lump, read as records of type `T`
    ///
    /// Both cursors move to the lump's start and both budgets reset to its
    /// byte length. The element count is the byte length divided by
    /// `T::SIZE`; a trailing partial record is not counted.
    pub fn select_lump<T: Record>(&mut self, id: impl Into<usize>) -> Result<&Selection> {
        let id = id.into();
        let lump = *self.directory.lump(id)?;
        let (byte_offset, byte_length) = lump.byte_range(id)?;
        let growth_room = self.growth_room(id, &lump);

        self.selection = Selection {
            lump_id: id,
            lump,
            byte_offset,
            byte_length,
            element_size: T::SIZE,
            element_count: whole_elements(byte_length, T::SIZE),
            remaining: Remaining {
                read: byte_length,
                write: byte_length,
            },
            growth_room,
        };
        self.file.set_read_cursor(byte_offset);
        self.file.set_write_cursor(byte_offset);

        debug!(
            lump = id,
            name = LumpId::from_index(id).map(LumpId::name).unwrap_or("?"),
            offset = byte_offset,
            length = byte_length,
            elements = self.selection.element_count,
            "selected lump"
        );
        Ok(&self.selection)
    }

    /// Free bytes after `lump` up to the next payload, capped so the length stays an i32
    fn growth_room(&self, id: usize, lump: &LumpDescriptor) -> u64 {
        if !self.config.allow_growth || lump.offset < DIRECTORY_SIZE as i32 || lump.length < 0 {
            return 0;
        }
        let end = lump.offset as u64 + lump.length as u64;

        let next_lump = self.directory.next_lump_start(id, end);
        let next_game_lump = self
            .game_lumps
            .entries()
            .iter()
            .filter(|entry| entry.length > 0 && entry.offset >= 0)
            .map(|entry| entry.offset as u64)
            .filter(|start| *start >= end)
            .min();
        let limit = match (next_lump, next_game_lump) {
            (Some(a), Some(b)) => a.min(b),
            (a, b) => a.or(b).unwrap_or(u64::MAX),
        };

        let room = limit - end;
        room.min(i32::MAX as u64 - lump.length as u64)
    }

    /// Stream records out of the selected lump into `out`
    ///
    /// `element_offset` skips that many records past the read cursor for
    /// this transfer only. Both the offset and the count are clamped to the
    /// read budget, so at most `remaining.read` bytes can be returned. The
    /// cursor and the budget move by the bytes actually read. Returns the
    /// byte count; `out` holds `bytes / T::SIZE` decoded records.
    pub fn read_elements<T: Record>(&mut self, out: &mut [T], element_offset: u64) -> Result<usize> {
        let size = T::SIZE;
        let available = whole_elements(self.selection.remaining.read, size);
        let offset = element_offset.min(available);
        let count = (out.len() as u64).min(available - offset);
        if count < out.len() as u64 {
            debug!(requested = out.len(), granted = count, "read request clamped");
        }

        let mut bytes = vec![0u8; count as usize * size];
        let read = self.file.read(size, &mut bytes, offset)?;
        self.selection.remaining.read -= read as u64;
        if read < bytes.len() {
            warn!(requested = bytes.len(), read, "short read inside lump");
        }

        let mut reader = FieldReader::new(&bytes[..read], self.directory.byte_order);
        for slot in out.iter_mut().take(read / size.max(1)) {
            *slot = T::decode(&mut reader)?;
        }
        Ok(read)
    }

    /// Stream records into the selected lump
    ///
    /// Clamped like [`read_elements`](Self::read_elements), against the write
    /// budget plus the lump's growth room. When the write ends past the
    /// recorded lump end, the lump's length field is rewritten in the
    /// directory on disk and in memory. Writes inside the lump leave the
    /// length alone. The write cursor is left where the payload write put
    /// it. Returns the byte count written.
    pub fn write_elements<T: Record>(&mut self, records: &[T], element_offset: u64) -> Result<usize> {
        let size = T::SIZE;
        let budget = self
            .selection
            .remaining
            .write
            .saturating_add(self.selection.growth_room);
        let available = whole_elements(budget, size);
        let offset = element_offset.min(available);
        let count = (records.len() as u64).min(available - offset) as usize;
        if count < records.len() {
            debug!(requested = records.len(), granted = count, "write request clamped");
        }

        let mut writer = FieldWriter::with_capacity(self.directory.byte_order, count * size);
        for record in &records[..count] {
            record.encode(&mut writer);
        }
        let bytes = writer.into_inner();

        let start = self.file.write_cursor() + offset * size as u64;
        let written = self.file.write(size, &bytes, offset)?;
        if written < bytes.len() {
            warn!(requested = bytes.len(), written, "short write inside lump");
        }

        let from_budget = (written as u64).min(self.selection.remaining.write);
        self.selection.remaining.write -= from_budget;
        self.selection.growth_room = self
            .selection
            .growth_room
            .saturating_sub(written as u64 - from_budget);

        let end = (start + written as u64).saturating_sub(self.selection.byte_offset);
        if written > 0 && end > self.selection.byte_length {
            self.patch_length(end)?;
        }
        Ok(written)
    }

    /// Rewrite the selected lump's length field to `length`
    ///
    /// Only called when a write ran past the recorded end, so the lump never
    /// shrinks and the read budget stays inside the new range.
    fn patch_length(&mut self, length: u64) -> Result<()> {
        let id = self.selection.lump_id;
        let new_length = i32::try_from(length).map_err(|_| BspError::InvalidLump {
            id,
            offset: self.selection.lump.offset,
            length: i32::MAX,
        })?;

        let position = self.directory.length_field_position(id)?;
        let mut field = FieldWriter::new(self.directory.byte_order);
        field.write_i32(new_length);

        let written = {
            let mut at_field = self.file.reposition(CursorKind::Write, position);
            at_field.write(1, field.as_slice(), 0)?
        };
        if written < field.len() {
            warn!(lump = id, written, "directory patch cut short");
        }

        debug!(
            lump = id,
            old = self.selection.byte_length,
            new = length,
            position,
            "patched lump length"
        );

        self.directory.lump_mut(id)?.length = new_length;
        self.selection.lump.length = new_length;
        self.selection.byte_length = length;
        self.selection.element_count = whole_elements(length, self.selection.element_size);
        Ok(())
    }

    fn element_index(&self, size: usize, index: u64) -> Option<u64> {
        let count = whole_elements(self.selection.byte_length, size);
        if count == 0 {
            None
        } else {
            Some(index.min(count - 1))
        }
    }

    /// Read one record at `index`, clamped to the last record
    ///
    /// Returns `None` for an empty lump or when the record could not be read
    /// in full. The streaming read cursor is unaffected.
    pub fn get_element<T: Record>(&mut self, index: u64) -> Result<Option<T>> {
        let size = T::SIZE;
        let index = match self.element_index(size, index) {
            Some(index) => index,
            None => return Ok(None),
        };
        let position = self.selection.byte_offset + index * size as u64;

        let mut bytes = vec![0u8; size];
        let read = {
            let mut at_element = self.file.reposition(CursorKind::Read, position);
            at_element.read(size, &mut bytes, 0)?
        };
        if read < size {
            return Ok(None);
        }

        let mut reader = FieldReader::new(&bytes, self.directory.byte_order);
        T::decode(&mut reader).map(Some)
    }

    /// Overwrite one record at `index`, clamped to the last record
    ///
    /// Returns the bytes written; 0 for an empty lump. The streaming write
    /// cursor, the budgets and the directory are unaffected.
    pub fn set_element<T: Record>(&mut self, value: &T, index: u64) -> Result<usize> {
        let size = T::SIZE;
        let index = match self.element_index(size, index) {
            Some(index) => index,
            None => return Ok(0),
        };
        let position = self.selection.byte_offset + index * size as u64;

        let mut writer = FieldWriter::with_capacity(self.directory.byte_order, size);
        value.encode(&mut writer);

        let mut at_element = self.file.reposition(CursorKind::Write, position);
        at_element.write(size, writer.as_slice(), 0)
    }

    /// Read the whole selected lump as records
    ///
    /// Only meaningful for lumps of fixed-size records. The streaming read
    /// cursor and budget are unaffected.
    pub fn get_all_elements<T: Record>(&mut self) -> Result<Vec<T>> {
        let length = whole_elements(self.selection.byte_length, T::SIZE) * T::SIZE as u64;
        let length = self.readable(self.selection.byte_offset, length);
        let mut bytes = vec![0u8; length as usize];
        let read = {
            let mut at_lump = self.file.reposition(CursorKind::Read, self.selection.byte_offset);
            at_lump.read(1, &mut bytes, 0)?
        };
        decode_records(&bytes[..read], self.directory.byte_order)
    }

    /// Bytes of `[offset, offset + length)` that lie inside the file
    fn readable(&self, offset: u64, length: u64) -> u64 {
        length.min(self.file.size().saturating_sub(offset))
    }

    /// Visibility lump byte range
    fn vis_range(&self) -> Result<(u64, u64)> {
        let id = LumpId::Visibility.index();
        self.directory.lump(id)?.byte_range(id)
    }

    /// Number of visibility clusters
    ///
    /// Reads the first field of the visibility lump regardless of the current
    /// selection. A visibility lump too small to hold the field has no
    /// clusters.
    pub fn get_vis_cluster_count(&mut self) -> Result<i32> {
        let (offset, length) = self.vis_range()?;
        if length < 4 {
            return Ok(0);
        }

        let mut bytes = [0u8; 4];
        let read = {
            let mut at_vis = self.file.reposition(CursorKind::Read, offset);
            at_vis.read(4, &mut bytes, 0)?
        };
        if read < 4 {
            return Err(BspError::truncated(offset as usize, 4, read));
        }
        FieldReader::new(&bytes, self.directory.byte_order).read_i32()
    }

    /// PVS and PAS byte offsets for each visibility cluster
    ///
    /// Clamped to the clusters the visibility lump actually holds.
    pub fn get_vis_data(&mut self) -> Result<Vec<ClusterOffsets>> {
        let clusters = self.get_vis_cluster_count()?;
        if clusters <= 0 {
            return Ok(Vec::new());
        }
        let (offset, length) = self.vis_range()?;

        let available = (length - 4) / ClusterOffsets::SIZE as u64;
        if clusters as u64 > available {
            warn!(clusters, available, "visibility lump shorter than its cluster count");
        }
        let on_disk = self.readable(offset + 4, available * ClusterOffsets::SIZE as u64)
            / ClusterOffsets::SIZE as u64;
        let take = (clusters as u64).min(available).min(on_disk) as usize;

        let mut bytes = vec![0u8; take * ClusterOffsets::SIZE];
        let read = {
            let mut at_offsets = self.file.reposition(CursorKind::Read, offset + 4);
            at_offsets.read(1, &mut bytes, 0)?
        };
        decode_records(&bytes[..read], self.directory.byte_order)
    }

    /// Count recorded in the game-lump sub-directory
    pub fn game_lump_count(&self) -> i32 {
        self.game_lumps.count()
    }

    pub fn all_game_lumps(&self) -> &[GameLump] {
        self.game_lumps.entries()
    }

    pub fn game_lump_directory(&self) -> &GameLumpDirectory {
        &self.game_lumps
    }

    pub fn find_game_lump(&self, id: i32) -> Option<&GameLump> {
        self.game_lumps.find(id)
    }

    /// Raw payload of the game lump `id`, as stored (compressed or not)
    pub fn read_game_lump(&mut self, id: i32) -> Result<Option<Vec<u8>>> {
        let entry = match self.game_lumps.find(id) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        if entry.offset < 0 || entry.length < 0 {
            return Err(BspError::InvalidLump {
                id: LumpId::GameLump.index(),
                offset: entry.offset,
                length: entry.length,
            });
        }

        let offset = entry.offset as u64;
        let length = self.readable(offset, entry.length as u64);
        let mut bytes = vec![0u8; length as usize];
        let read = {
            let mut at_payload = self.file.reposition(CursorKind::Read, offset);
            at_payload.read(1, &mut bytes, 0)?
        };
        bytes.truncate(read);
        Ok(Some(bytes))
    }

    /// Classify the directory ident
    pub fn check_ident(&self) -> Ident {
        self.directory.ident()
    }

    /// Like [`check_ident`](Self::check_ident), but an unknown ident is an error
    pub fn validate_ident(&self) -> Result<Ident> {
        match self.directory.ident() {
            Ident::Unknown => Err(BspError::UnknownIdent(self.directory.ident)),
            known => Ok(known),
        }
    }

    /// Overwrite the selected lump's whole directory entry on disk
    ///
    /// The selection keeps its byte range and budgets; select the lump again
    /// to stream through the new range.
    pub fn set_lump(&mut self, descriptor: LumpDescriptor) -> Result<()> {
        let id = self.selection.lump_id;
        let position = self.directory.descriptor_position(id)?;
        let bytes = self.directory.encode_descriptor(&descriptor);

        let written = {
            let mut at_entry = self.file.reposition(CursorKind::Write, position);
            at_entry.write(1, &bytes, 0)?
        };
        if written < bytes.len() {
            warn!(lump = id, written, "directory entry write cut short");
        }

        *self.directory.lump_mut(id)? = descriptor;
        self.selection.lump = descriptor;
        debug!(lump = id, ?descriptor, "replaced directory entry");
        Ok(())
    }

    /// Copy the file to `<path><suffix>`; see [`DualCursorFile::backup`]
    pub fn backup(
        &self,
        suffix: &str,
        block_size: usize,
        overwrite: bool,
        transform: Option<ByteTransform<'_>>,
    ) -> Result<BackupStatus> {
        self.file.backup(suffix, block_size, overwrite, transform)
    }

    /// Back up with the configured settings
    pub fn backup_with_config(&self) -> Result<BackupStatus> {
        self.file.backup_with(&self.config.backup)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync()
    }

    pub fn format_version(&self) -> i32 {
        self.directory.format_version
    }

    pub fn map_revision(&self) -> i32 {
        self.directory.map_revision
    }

    /// Raw ident value
    pub fn ident(&self) -> i32 {
        self.directory.ident
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.directory.byte_order
    }

    pub fn layout(&self) -> DirectoryLayout {
        self.directory.layout
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn config(&self) -> &AccessorConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Directory entry of the selected lump
    pub fn lump(&self) -> LumpDescriptor {
        self.selection.lump
    }

    pub fn lump_version(&self) -> i32 {
        self.selection.lump.version
    }

    pub fn four_cc(&self) -> [u8; 4] {
        self.selection.lump.four_cc()
    }

    pub fn compressed_size(&self) -> i32 {
        self.selection.lump.compressed_size(self.directory.byte_order)
    }

    pub fn lump_byte_length(&self) -> u64 {
        self.selection.byte_length
    }

    pub fn element_count(&self) -> u64 {
        self.selection.element_count
    }

    pub fn remaining_read(&self) -> u64 {
        self.selection.remaining.read
    }

    pub fn remaining_write(&self) -> u64 {
        self.selection.remaining.write
    }

    pub fn growth_room_left(&self) -> u64 {
        self.selection.growth_room
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn bytes_read(&self) -> u64 {
        self.file.bytes_read()
    }

    pub fn bytes_written(&self) -> u64 {
        self.file.bytes_written()
    }

    /// The underlying file, for cursor inspection
    pub fn file(&self) -> &DualCursorFile {
        &self.file
    }
}

/// Parse the game-lump sub-directory from its slot
///
/// A slot with a negative range, or one that runs past the end of the file,
/// is tolerated and clamped. A failed read is an error.
fn read_game_lump_directory(file: &mut DualCursorFile, directory: &Directory) -> Result<GameLumpDirectory> {
    let id = LumpId::GameLump.index();
    let (offset, length) = match directory.lumps[id].byte_range(id) {
        Ok(range) => range,
        Err(e) => {
            warn!(error = %e, "ignoring game lump directory");
            return Ok(GameLumpDirectory::empty());
        }
    };
    let length = length.min(file.size().saturating_sub(offset));
    if length == 0 {
        return Ok(GameLumpDirectory::empty());
    }

    let mut bytes = vec![0u8; length as usize];
    let read = {
        let mut at_slot = file.reposition(CursorKind::Read, offset);
        at_slot.read(1, &mut bytes, 0)?
    };
    Ok(GameLumpDirectory::parse(&bytes[..read], directory.byte_order))
}

use crate::bsp::record::{FieldReader, FieldWriter, Record};
use crate::error::{BspError, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::io::{ErrorKind, Read, Write};
use tracing::debug;

/// Number of directory slots
pub const HEADER_LUMPS: usize = 64;

/// Encoded size of one directory slot
pub const LUMP_DESCRIPTOR_SIZE: usize = 16;

/// Byte position of the first directory slot (after ident and version)
pub const LUMPS_OFFSET: usize = 8;

/// Directory header size: ident, version, 64 slots, map revision
pub const DIRECTORY_SIZE: usize = LUMPS_OFFSET + HEADER_LUMPS * LUMP_DESCRIPTOR_SIZE + 4;

/// "VBSP" read as a little-endian i32
pub const IDENT_VBSP: i32 = 0x5053_4256;

/// Byte-swapped ident written by big-endian toolchains
pub const IDENT_VBSP_SWAPPED: i32 = 0x5642_5350;

/// Format version whose descriptors may use the Left 4 Dead 2 field order
pub const L4D2_FORMAT_VERSION: i32 = 21;

/// Byte order of every integer after the ident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::Little
    }
}

/// Classification of the directory ident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ident {
    LittleEndian,
    BigEndian,
    Unknown,
}

impl Ident {
    pub fn classify(ident: i32) -> Self {
        match ident {
            IDENT_VBSP => Self::LittleEndian,
            IDENT_VBSP_SWAPPED => Self::BigEndian,
            _ => Self::Unknown,
        }
    }

    /// Byte order implied by the ident; unknown idents decode little-endian
    pub fn byte_order(self) -> ByteOrder {
        match self {
            Self::BigEndian => ByteOrder::Big,
            Self::LittleEndian | Self::Unknown => ByteOrder::Little,
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Raw ident value that announces `order`
    pub fn magic_for(order: ByteOrder) -> i32 {
        match order {
            ByteOrder::Little => IDENT_VBSP,
            ByteOrder::Big => IDENT_VBSP_SWAPPED,
        }
    }
}

/// Field order of a directory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryLayout {
    /// offset, length, version, tag
    Standard,
    /// version, offset, length, tag
    Left4Dead2,
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self::Standard
    }
}

impl DirectoryLayout {
    /// Byte position of the length field within a slot
    pub fn length_field_offset(self) -> usize {
        match self {
            Self::Standard => 4,
            Self::Left4Dead2 => 8,
        }
    }

    pub fn decode_descriptor(self, reader: &mut FieldReader<'_>) -> Result<LumpDescriptor> {
        let (offset, length, version) = match self {
            Self::Standard => {
                let offset = reader.read_i32()?;
                let length = reader.read_i32()?;
                let version = reader.read_i32()?;
                (offset, length, version)
            }
            Self::Left4Dead2 => {
                let version = reader.read_i32()?;
                let offset = reader.read_i32()?;
                let length = reader.read_i32()?;
                (offset, length, version)
            }
        };
        let tag = reader.read_array::<4>()?;
        Ok(LumpDescriptor {
            offset,
            length,
            version,
            tag,
        })
    }

    pub fn encode_descriptor(self, descriptor: &LumpDescriptor, writer: &mut FieldWriter) {
        match self {
            Self::Standard => {
                writer.write_i32(descriptor.offset);
                writer.write_i32(descriptor.length);
                writer.write_i32(descriptor.version);
            }
            Self::Left4Dead2 => {
                writer.write_i32(descriptor.version);
                writer.write_i32(descriptor.offset);
                writer.write_i32(descriptor.length);
            }
        }
        writer.write_bytes(&descriptor.tag);
    }
}

/// One directory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LumpDescriptor {
    pub offset: i32,
    pub length: i32,
    pub version: i32,
    /// Four-character code, or the compressed size when the lump is compressed
    #[serde(serialize_with = "serialize_tag")]
    pub tag: [u8; 4],
}

impl LumpDescriptor {
    pub fn new(offset: i32, length: i32, version: i32) -> Self {
        Self {
            offset,
            length,
            version,
            tag: [0; 4],
        }
    }

    pub fn four_cc(&self) -> [u8; 4] {
        self.tag
    }

    /// The tag read as an integer in the file's byte order
    pub fn compressed_size(&self, order: ByteOrder) -> i32 {
        match order {
            ByteOrder::Little => i32::from_le_bytes(self.tag),
            ByteOrder::Big => i32::from_be_bytes(self.tag),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length <= 0
    }

    /// Absolute `(offset, length)` of the payload
    ///
    /// Negative values cannot address a byte range and are rejected.
    pub fn byte_range(&self, id: usize) -> Result<(u64, u64)> {
        if self.offset < 0 || self.length < 0 {
            return Err(BspError::InvalidLump {
                id,
                offset: self.offset,
                length: self.length,
            });
        }
        Ok((self.offset as u64, self.length as u64))
    }

    /// End of the payload, or `None` for a descriptor with negative fields
    pub fn end(&self) -> Option<u64> {
        if self.offset < 0 || self.length < 0 {
            return None;
        }
        Some(self.offset as u64 + self.length as u64)
    }
}

impl Record for LumpDescriptor {
    const SIZE: usize = LUMP_DESCRIPTOR_SIZE;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        DirectoryLayout::Standard.decode_descriptor(reader)
    }

    fn encode(&self, writer: &mut FieldWriter) {
        DirectoryLayout::Standard.encode_descriptor(self, writer)
    }
}

fn serialize_tag<S: Serializer>(tag: &[u8; 4], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(tag))
}

fn serialize_lumps<S: Serializer>(
    lumps: &[LumpDescriptor; HEADER_LUMPS],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(lumps.iter())
}

/// The fixed header at offset 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    pub ident: i32,
    pub format_version: i32,
    #[serde(serialize_with = "serialize_lumps")]
    pub lumps: [LumpDescriptor; HEADER_LUMPS],
    pub map_revision: i32,
    pub byte_order: ByteOrder,
    pub layout: DirectoryLayout,
}

impl Directory {
    /// Empty directory with the magic matching `order`
    pub fn new(order: ByteOrder, layout: DirectoryLayout) -> Self {
        Self {
            ident: Ident::magic_for(order),
            format_version: 20,
            lumps: [LumpDescriptor::default(); HEADER_LUMPS],
            map_revision: 0,
            byte_order: order,
            layout,
        }
    }

    /// Read the header from a reader
    pub fn read_from<R: Read>(
        mut reader: R,
        forced_layout: Option<DirectoryLayout>,
        file_size: u64,
    ) -> Result<Self> {
        let mut bytes = [0u8; DIRECTORY_SIZE];
        reader.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                BspError::InvalidDirectory(format!(
                    "header needs {} bytes, file is shorter",
                    DIRECTORY_SIZE
                ))
            } else {
                BspError::Io(e)
            }
        })?;
        Self::from_bytes(&bytes, forced_layout, file_size)
    }

    /// Parse the header from the first [`DIRECTORY_SIZE`] bytes of `bytes`
    ///
    /// The ident is always stored little-endian; its value then decides the
    /// byte order of the rest. The slot layout is taken from `forced_layout`
    /// or detected against `file_size`.
    pub fn from_bytes(
        bytes: &[u8],
        forced_layout: Option<DirectoryLayout>,
        file_size: u64,
    ) -> Result<Self> {
        if bytes.len() < DIRECTORY_SIZE {
            return Err(BspError::InvalidDirectory(format!(
                "header needs {} bytes, found {}",
                DIRECTORY_SIZE,
                bytes.len()
            )));
        }

        let ident = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let order = Ident::classify(ident).byte_order();

        let mut reader = FieldReader::new(&bytes[4..DIRECTORY_SIZE], order);
        let format_version = reader.read_i32()?;

        let slots = &bytes[LUMPS_OFFSET..LUMPS_OFFSET + HEADER_LUMPS * LUMP_DESCRIPTOR_SIZE];
        let layout = match forced_layout {
            Some(layout) => layout,
            None => detect_layout(format_version, slots, order, file_size)?,
        };

        let mut lumps = [LumpDescriptor::default(); HEADER_LUMPS];
        for lump in lumps.iter_mut() {
            *lump = layout.decode_descriptor(&mut reader)?;
        }
        let map_revision = reader.read_i32()?;

        Ok(Self {
            ident,
            format_version,
            lumps,
            map_revision,
            byte_order: order,
            layout,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = FieldWriter::with_capacity(self.byte_order, DIRECTORY_SIZE);
        writer.write_bytes(&self.ident.to_le_bytes());
        writer.write_i32(self.format_version);
        for lump in &self.lumps {
            self.layout.encode_descriptor(lump, &mut writer);
        }
        writer.write_i32(self.map_revision);
        writer.into_inner()
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Pretty JSON dump of the header, tags rendered as hex
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn ident(&self) -> Ident {
        Ident::classify(self.ident)
    }

    pub fn lump(&self, id: usize) -> Result<&LumpDescriptor> {
        self.lumps.get(id).ok_or(BspError::LumpOutOfRange {
            id,
            max: HEADER_LUMPS - 1,
        })
    }

    pub fn lump_mut(&mut self, id: usize) -> Result<&mut LumpDescriptor> {
        self.lumps.get_mut(id).ok_or(BspError::LumpOutOfRange {
            id,
            max: HEADER_LUMPS - 1,
        })
    }

    /// Absolute file position of slot `id`
    pub fn descriptor_position(&self, id: usize) -> Result<u64> {
        self.lump(id)?;
        Ok((LUMPS_OFFSET + id * LUMP_DESCRIPTOR_SIZE) as u64)
    }

    /// Absolute file position of slot `id`'s length field
    pub fn length_field_position(&self, id: usize) -> Result<u64> {
        Ok(self.descriptor_position(id)? + self.layout.length_field_offset() as u64)
    }

    /// Encode one slot in this directory's layout and byte order
    pub fn encode_descriptor(&self, descriptor: &LumpDescriptor) -> Vec<u8> {
        let mut writer = FieldWriter::with_capacity(self.byte_order, LUMP_DESCRIPTOR_SIZE);
        self.layout.encode_descriptor(descriptor, &mut writer);
        writer.into_inner()
    }

    /// Start of the nearest non-empty lump that begins at or after `position`,
    /// ignoring slot `exclude`
    pub fn next_lump_start(&self, exclude: usize, position: u64) -> Option<u64> {
        self.lumps
            .iter()
            .enumerate()
            .filter(|(id, lump)| *id != exclude && lump.length > 0 && lump.offset >= 0)
            .map(|(_, lump)| lump.offset as u64)
            .filter(|start| *start >= position)
            .min()
    }
}

/// Count slots whose reading under `layout` cannot describe a payload in the file
fn implausible_slots(slots: &[u8], layout: DirectoryLayout, order: ByteOrder, file_size: u64) -> Result<usize> {
    let mut reader = FieldReader::new(slots, order);
    let mut bad = 0;
    for _ in 0..HEADER_LUMPS {
        let lump = layout.decode_descriptor(&mut reader)?;
        if lump.length == 0 {
            continue;
        }
        let plausible = match lump.end() {
            Some(end) => lump.offset as u64 >= DIRECTORY_SIZE as u64 && end <= file_size,
            None => false,
        };
        if !plausible {
            bad += 1;
        }
    }
    Ok(bad)
}

fn detect_layout(
    format_version: i32,
    slots: &[u8],
    order: ByteOrder,
    file_size: u64,
) -> Result<DirectoryLayout> {
    if format_version != L4D2_FORMAT_VERSION {
        return Ok(DirectoryLayout::Standard);
    }

    let standard = implausible_slots(slots, DirectoryLayout::Standard, order, file_size)?;
    if standard == 0 {
        return Ok(DirectoryLayout::Standard);
    }
    let l4d2 = implausible_slots(slots, DirectoryLayout::Left4Dead2, order, file_size)?;
    if l4d2 < standard {
        debug!(standard, l4d2, "using Left 4 Dead 2 descriptor layout");
        Ok(DirectoryLayout::Left4Dead2)
    } else {
        Ok(DirectoryLayout::Standard)
    }
}

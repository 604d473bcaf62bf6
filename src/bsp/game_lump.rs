//! Game-lump sub-directory
//!
//! The game-lump slot holds `count: i32` followed by 16-byte entries that
//! point at engine-specific payloads elsewhere in the file.

use crate::bsp::format::ByteOrder;
use crate::bsp::record::{decode_records, FieldReader, FieldWriter, Record};
use crate::error::Result;
use serde::Serialize;
use tracing::warn;

/// Static props ("sprp")
pub const GAME_LUMP_STATIC_PROPS: i32 = 0x7370_7270;
/// Detail props ("dprp")
pub const GAME_LUMP_DETAIL_PROPS: i32 = 0x6470_7270;
/// Detail prop lighting, LDR ("dplt")
pub const GAME_LUMP_DETAIL_LIGHTING_LDR: i32 = 0x6470_6c74;
/// Detail prop lighting, HDR ("dplh")
pub const GAME_LUMP_DETAIL_LIGHTING_HDR: i32 = 0x6470_6c68;

/// Entry flag marking a compressed payload
pub const GAME_LUMP_FLAG_COMPRESSED: u16 = 0x0001;

/// Identifier for a four-character code such as `b"sprp"`
pub const fn game_lump_id(code: &[u8; 4]) -> i32 {
    i32::from_be_bytes(*code)
}

/// One sub-directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GameLump {
    pub id: i32,
    pub flags: u16,
    pub version: u16,
    pub offset: i32,
    pub length: i32,
}

impl GameLump {
    /// The id as its four-character code
    pub fn fourcc(&self) -> [u8; 4] {
        self.id.to_be_bytes()
    }

    /// Printable code, or hex when the bytes are not ASCII
    pub fn name(&self) -> String {
        let code = self.fourcc();
        if code.iter().all(|b| b.is_ascii_graphic()) {
            code.iter().map(|&b| b as char).collect()
        } else {
            hex::encode(code)
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & GAME_LUMP_FLAG_COMPRESSED != 0
    }
}

impl Record for GameLump {
    const SIZE: usize = 16;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            id: reader.read_i32()?,
            flags: reader.read_u16()?,
            version: reader.read_u16()?,
            offset: reader.read_i32()?,
            length: reader.read_i32()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.write_i32(self.id);
        writer.write_u16(self.flags);
        writer.write_u16(self.version);
        writer.write_i32(self.offset);
        writer.write_i32(self.length);
    }
}

/// Parsed game-lump sub-directory
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GameLumpDirectory {
    /// Count as recorded in the file
    count: i32,
    entries: Vec<GameLump>,
}

impl GameLumpDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the slot's bytes
    ///
    /// Never fails: a slot too short for its count yields the entries that
    /// fit, and a negative count yields none.
    pub fn parse(bytes: &[u8], order: ByteOrder) -> Self {
        if bytes.len() < 4 {
            return Self::empty();
        }

        let mut reader = FieldReader::new(bytes, order);
        let count = match reader.read_i32() {
            Ok(count) => count,
            Err(_) => return Self::empty(),
        };
        let wanted = count.max(0) as usize;
        let available = (bytes.len() - 4) / GameLump::SIZE;
        if wanted > available {
            warn!(count, available, "game lump directory truncated");
        }
        let take = wanted.min(available);

        let entries = decode_records::<GameLump>(&bytes[4..4 + take * GameLump::SIZE], order)
            .unwrap_or_default();

        Self { count, entries }
    }

    /// Count recorded in the file
    pub fn count(&self) -> i32 {
        self.count
    }

    /// Entries that were actually present
    pub fn entries(&self) -> &[GameLump] {
        &self.entries
    }

    pub fn find(&self, id: i32) -> Option<&GameLump> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn encode(entries: &[GameLump], order: ByteOrder) -> Vec<u8> {
        let mut writer = FieldWriter::with_capacity(order, 4 + entries.len() * GameLump::SIZE);
        writer.write_i32(entries.len() as i32);
        for entry in entries {
            entry.encode(&mut writer);
        }
        writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> Vec<GameLump> {
        vec![
            GameLump {
                id: GAME_LUMP_STATIC_PROPS,
                flags: 0,
                version: 10,
                offset: 2000,
                length: 64,
            },
            GameLump {
                id: GAME_LUMP_DETAIL_PROPS,
                flags: GAME_LUMP_FLAG_COMPRESSED,
                version: 4,
                offset: 2064,
                length: 12,
            },
        ]
    }

    #[test]
    fn test_fourcc_ids() {
        assert_eq!(game_lump_id(b"sprp"), GAME_LUMP_STATIC_PROPS);
        assert_eq!(game_lump_id(b"dplh"), GAME_LUMP_DETAIL_LIGHTING_HDR);
        assert_eq!(props()[0].name(), "sprp");
        assert!(props()[1].is_compressed());
    }

    #[test]
    fn test_parse_both_orders() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let bytes = GameLumpDirectory::encode(&props(), order);
            let dir = GameLumpDirectory::parse(&bytes, order);
            assert_eq!(dir.count(), 2);
            assert_eq!(dir.entries(), props().as_slice());
            assert_eq!(dir.find(GAME_LUMP_DETAIL_PROPS).unwrap().offset, 2064);
            assert!(dir.find(GAME_LUMP_DETAIL_LIGHTING_LDR).is_none());
        }
    }

    #[test]
    fn test_truncated_entries() {
        let mut bytes = GameLumpDirectory::encode(&props(), ByteOrder::Little);
        bytes.truncate(4 + 16 + 5);

        let dir = GameLumpDirectory::parse(&bytes, ByteOrder::Little);
        assert_eq!(dir.count(), 2);
        assert_eq!(dir.entries().len(), 1);
    }

    #[test]
    fn test_degenerate_slots() {
        assert_eq!(GameLumpDirectory::parse(&[], ByteOrder::Little).count(), 0);

        let negative = (-5i32).to_le_bytes();
        let dir = GameLumpDirectory::parse(&negative, ByteOrder::Little);
        assert_eq!(dir.count(), -5);
        assert!(dir.entries().is_empty());
    }
}

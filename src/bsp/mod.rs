mod accessor;
mod format;
mod game_lump;
mod lump_id;
mod record;
mod records;
mod writer;

pub use accessor::{BspFile, Remaining, Selection};
pub use format::{
    ByteOrder, Directory, DirectoryLayout, Ident, LumpDescriptor, DIRECTORY_SIZE, HEADER_LUMPS,
    IDENT_VBSP, IDENT_VBSP_SWAPPED, L4D2_FORMAT_VERSION, LUMPS_OFFSET, LUMP_DESCRIPTOR_SIZE,
};
pub use game_lump::{
    game_lump_id, GameLump, GameLumpDirectory, GAME_LUMP_DETAIL_LIGHTING_HDR,
    GAME_LUMP_DETAIL_LIGHTING_LDR, GAME_LUMP_DETAIL_PROPS, GAME_LUMP_FLAG_COMPRESSED,
    GAME_LUMP_STATIC_PROPS,
};
pub use lump_id::LumpId;
pub use record::{decode_records, encode_records, FieldReader, FieldWriter, Record};
pub use records::{Brush, BrushSide, ClusterOffsets, CubemapSample, Edge, Model, Plane, Vector};
pub use writer::BspWriter;

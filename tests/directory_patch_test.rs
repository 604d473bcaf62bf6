//! Directory length patches after bulk writes

use bsplump_rs::{
    AccessorConfig, BspFile, BspWriter, ByteOrder, Directory, DirectoryLayout, LumpDescriptor,
    LumpId, Vector,
};
use std::path::Path;
use tempfile::NamedTempFile;

fn vectors(count: usize, seed: f32) -> Vec<Vector> {
    (0..count)
        .map(|i| Vector::new(seed + i as f32, 0.5, 100.0))
        .collect()
}

/// Helper: entities followed by a two-vertex lump, which is last in the file
fn create_trailing_vertex_map(writer: BspWriter) -> BspWriter {
    let mut writer = writer;
    writer.add_lump(LumpId::Entities, 0, b"{}\0\0").unwrap();
    writer.add_records(LumpId::Vertexes, 0, &vectors(2, 0.0)).unwrap();
    writer
}

fn trailing_vertex_map() -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let writer = BspWriter::create(temp_file.path()).unwrap();
    create_trailing_vertex_map(writer).finalize().unwrap();
    temp_file
}

fn directory_on_disk(path: &Path) -> Directory {
    let bytes = std::fs::read(path).unwrap();
    Directory::from_bytes(&bytes, None, bytes.len() as u64).unwrap()
}

#[test]
fn test_growing_write_patches_length() {
    let temp_file = trailing_vertex_map();
    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    let selection = bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    assert_eq!(selection.element_count, 2);
    let start = selection.byte_offset;

    let written = bsp.write_elements(&vectors(3, 10.0), 0).unwrap();
    assert_eq!(written, 36);

    // In memory
    assert_eq!(bsp.lump_byte_length(), 36);
    assert_eq!(bsp.element_count(), 3);
    assert_eq!(bsp.directory().lumps[LumpId::Vertexes.index()].length, 36);

    // Write cursor sits where the payload write left it
    assert_eq!(bsp.file().write_cursor(), start + 36);

    // On disk, immediately
    let dir = directory_on_disk(temp_file.path());
    assert_eq!(dir.lumps[LumpId::Vertexes.index()].length, 36);

    // Reselecting sees three records
    let selection = bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    assert_eq!(selection.element_count, 3);
    assert_eq!(bsp.get_all_elements::<Vector>().unwrap(), vectors(3, 10.0));
}

#[test]
fn test_patch_survives_reopen() {
    let temp_file = trailing_vertex_map();
    {
        let mut bsp = BspFile::open(temp_file.path()).unwrap();
        bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
        bsp.write_elements(&vectors(5, 1.0), 0).unwrap();
        bsp.sync().unwrap();
    }

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    assert_eq!(bsp.element_count(), 5);
    assert_eq!(bsp.get_all_elements::<Vector>().unwrap(), vectors(5, 1.0));
}

#[test]
fn test_sequential_writes_grow_in_steps() {
    let temp_file = trailing_vertex_map();
    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();

    bsp.write_elements(&vectors(2, 0.0), 0).unwrap();
    assert_eq!(bsp.lump_byte_length(), 24);
    bsp.write_elements(&vectors(1, 2.0), 0).unwrap();
    assert_eq!(bsp.lump_byte_length(), 36);
    bsp.write_elements(&vectors(1, 3.0), 0).unwrap();
    assert_eq!(bsp.lump_byte_length(), 48);

    assert_eq!(directory_on_disk(temp_file.path()).lumps[3].length, 48);
}

#[test]
fn test_short_write_keeps_length() {
    let temp_file = trailing_vertex_map();
    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();

    bsp.write_elements(&vectors(1, 9.0), 0).unwrap();
    assert_eq!(bsp.element_count(), 2);
    assert_eq!(directory_on_disk(temp_file.path()).lumps[3].length, 24);

    // Reading the rest of the lump stops at the recorded end
    let mut out = [Vector::default(); 4];
    assert_eq!(bsp.read_elements(&mut out, 0).unwrap(), 24);
    assert_eq!(out[0], vectors(1, 9.0)[0]);
    assert_eq!(out[1], vectors(2, 0.0)[1]);
    assert_eq!(bsp.read_elements(&mut out, 0).unwrap(), 0);
}

#[test]
fn test_in_place_edit_keeps_later_records() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = BspWriter::create(temp_file.path()).unwrap();
    writer.add_records(LumpId::Vertexes, 0, &vectors(10, 0.0)).unwrap();
    writer.add_lump(LumpId::Models, 0, &[0xEE; 16]).unwrap();
    writer.finalize().unwrap();

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    let edited = Vector::new(-5.0, -5.0, -5.0);
    assert_eq!(bsp.write_elements(&[edited], 5).unwrap(), 12);

    assert_eq!(bsp.lump_byte_length(), 120);
    assert_eq!(bsp.element_count(), 10);
    assert_eq!(directory_on_disk(temp_file.path()).lumps[3].length, 120);

    let mut expected = vectors(10, 0.0);
    expected[5] = edited;
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    assert_eq!(bsp.element_count(), 10);
    assert_eq!(bsp.get_all_elements::<Vector>().unwrap(), expected);

    bsp.select_lump::<u8>(LumpId::Models).unwrap();
    assert_eq!(bsp.get_all_elements::<u8>().unwrap(), vec![0xEE; 16]);
}

#[test]
fn test_growth_blocked_by_following_lump() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = BspWriter::create(temp_file.path()).unwrap();
    writer.add_records(LumpId::Vertexes, 0, &vectors(2, 0.0)).unwrap();
    writer.add_lump(LumpId::Planes, 0, &[0xAA; 20]).unwrap();
    writer.finalize().unwrap();

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    assert_eq!(bsp.selection().growth_room, 0);

    let written = bsp.write_elements(&vectors(3, 5.0), 0).unwrap();
    assert_eq!(written, 24);
    assert_eq!(bsp.lump_byte_length(), 24);

    bsp.select_lump::<u8>(LumpId::Planes).unwrap();
    assert_eq!(bsp.get_all_elements::<u8>().unwrap(), vec![0xAA; 20]);
    assert_eq!(directory_on_disk(temp_file.path()).lumps[3].length, 24);
}

#[test]
fn test_growth_disabled_by_config() {
    let temp_file = trailing_vertex_map();
    let config = AccessorConfig {
        allow_growth: false,
        ..AccessorConfig::default()
    };
    let mut bsp = BspFile::open_with(temp_file.path(), &config).unwrap();
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();

    assert_eq!(bsp.write_elements(&vectors(3, 0.0), 0).unwrap(), 24);
    assert_eq!(bsp.lump_byte_length(), 24);
}

#[test]
fn test_big_endian_patch_bytes() {
    let temp_file = NamedTempFile::new().unwrap();
    let writer = BspWriter::create(temp_file.path())
        .unwrap()
        .with_byte_order(ByteOrder::Big);
    create_trailing_vertex_map(writer).finalize().unwrap();

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    bsp.write_elements(&vectors(3, 0.0), 0).unwrap();

    let raw = std::fs::read(temp_file.path()).unwrap();
    let field = 8 + 3 * 16 + 4;
    assert_eq!(&raw[field..field + 4], &[0, 0, 0, 36]);
}

#[test]
fn test_left4dead2_patch_position() {
    let temp_file = NamedTempFile::new().unwrap();
    let writer = BspWriter::create(temp_file.path())
        .unwrap()
        .with_format_version(21)
        .with_layout(DirectoryLayout::Left4Dead2);
    create_trailing_vertex_map(writer).finalize().unwrap();

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    assert_eq!(bsp.layout(), DirectoryLayout::Left4Dead2);
    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    bsp.write_elements(&vectors(3, 0.0), 0).unwrap();

    let raw = std::fs::read(temp_file.path()).unwrap();
    let slot = 8 + 3 * 16;
    // version, offset, length
    assert_eq!(&raw[slot + 8..slot + 12], &36i32.to_le_bytes());
    assert_eq!(&raw[slot + 4..slot + 8], &1040i32.to_le_bytes());
}

#[test]
fn test_set_lump_rewrites_entry() {
    let temp_file = trailing_vertex_map();
    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    let offset = bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap().lump.offset;
    let write_cursor = bsp.file().write_cursor();

    let descriptor = LumpDescriptor {
        offset,
        length: 12,
        version: 2,
        tag: *b"LZMA",
    };
    bsp.set_lump(descriptor).unwrap();

    assert_eq!(bsp.lump(), descriptor);
    assert_eq!(bsp.lump_version(), 2);
    assert_eq!(bsp.four_cc(), *b"LZMA");
    assert_eq!(bsp.file().write_cursor(), write_cursor);
    assert_eq!(directory_on_disk(temp_file.path()).lumps[3], descriptor);

    bsp.select_lump::<Vector>(LumpId::Vertexes).unwrap();
    assert_eq!(bsp.element_count(), 1);
}

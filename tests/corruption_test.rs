//! Malformed and hostile map files

use bsplump_rs::{
    AccessorConfig, BspError, BspFile, BspWriter, ByteOrder, Directory, DirectoryLayout, Ident,
    LumpDescriptor, LumpId, DIRECTORY_SIZE,
};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// Helper: Create a valid test map
fn create_test_map() -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = BspWriter::create(temp_file.path()).unwrap();
    writer.add_lump(LumpId::Entities, 0, b"{}\0\0").unwrap();
    writer.add_lump(LumpId::Planes, 0, &[1u8; 40]).unwrap();
    writer.finalize().unwrap();
    temp_file
}

/// Helper: Write a hand-built directory followed by `payload`
fn map_from_directory(directory: &Directory, payload: &[u8]) -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut bytes = directory.to_bytes();
    bytes.extend_from_slice(payload);
    std::fs::write(temp_file.path(), bytes).unwrap();
    temp_file
}

/// Helper: Overwrite bytes at a specific offset
fn corrupt_bytes_at(path: &std::path::Path, offset: u64, bytes: &[u8]) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(bytes).unwrap();
}

#[test]
fn test_unknown_ident_is_tolerated() {
    let temp_file = create_test_map();
    corrupt_bytes_at(temp_file.path(), 0, b"IBSP");

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    assert_eq!(bsp.check_ident(), Ident::Unknown);
    assert_eq!(bsp.byte_order(), ByteOrder::Little);

    match bsp.validate_ident() {
        Err(BspError::UnknownIdent(ident)) => {
            assert_eq!(ident, i32::from_le_bytes(*b"IBSP"))
        }
        other => panic!("Expected UnknownIdent, got: {:?}", other),
    }

    // Lumps are still reachable
    bsp.select_lump::<u8>(LumpId::Planes).unwrap();
    assert_eq!(bsp.get_all_elements::<u8>().unwrap(), vec![1u8; 40]);
}

#[test]
fn test_unknown_ident_rejected_when_strict() {
    let temp_file = create_test_map();
    corrupt_bytes_at(temp_file.path(), 0, &[0, 0, 0, 0]);

    let config = AccessorConfig {
        strict_ident: true,
        ..AccessorConfig::default()
    };
    let result = BspFile::open_with(temp_file.path(), &config);
    assert!(matches!(result, Err(BspError::UnknownIdent(0))));
}

#[test]
fn test_truncated_header() {
    let temp_file = create_test_map();
    let file = OpenOptions::new().write(true).open(temp_file.path()).unwrap();
    file.set_len(DIRECTORY_SIZE as u64 - 1).unwrap();

    let result = BspFile::open(temp_file.path());
    assert!(matches!(result, Err(BspError::InvalidDirectory(_))));
}

#[test]
fn test_empty_file() {
    let temp_file = NamedTempFile::new().unwrap();
    let result = BspFile::open(temp_file.path());
    assert!(matches!(result, Err(BspError::InvalidDirectory(_))));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.bsp");

    match BspFile::open(&path) {
        Err(BspError::Open { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected Open error, got: {:?}", other),
    }
    // Opening never creates the file
    assert!(!path.exists());
}

#[test]
fn test_open_does_not_modify_file() {
    let temp_file = create_test_map();
    let before = std::fs::read(temp_file.path()).unwrap();

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<u8>(LumpId::Planes).unwrap();
    bsp.get_all_elements::<u8>().unwrap();
    bsp.get_vis_cluster_count().unwrap();
    drop(bsp);

    assert_eq!(std::fs::read(temp_file.path()).unwrap(), before);
}

#[test]
fn test_negative_lump_offset() {
    let mut directory = Directory::new(ByteOrder::Little, DirectoryLayout::Standard);
    directory.lumps[LumpId::Entities.index()] = LumpDescriptor::new(-8, 16, 0);
    let temp_file = map_from_directory(&directory, &[0u8; 16]);

    // The default selection fails
    let result = BspFile::open(temp_file.path());
    assert!(matches!(
        result,
        Err(BspError::InvalidLump { id: 0, offset: -8, length: 16 })
    ));

    // Starting on another lump works; selecting the broken one does not
    let config = AccessorConfig {
        default_lump: LumpId::Planes.index(),
        ..AccessorConfig::default()
    };
    let mut bsp = BspFile::open_with(temp_file.path(), &config).unwrap();
    assert!(matches!(
        bsp.select_lump::<u8>(LumpId::Entities),
        Err(BspError::InvalidLump { id: 0, .. })
    ));
}

#[test]
fn test_lump_past_end_of_file() {
    let mut directory = Directory::new(ByteOrder::Little, DirectoryLayout::Standard);
    directory.lumps[LumpId::Planes.index()] =
        LumpDescriptor::new(DIRECTORY_SIZE as i32, 1000, 0);
    let temp_file = map_from_directory(&directory, &[9u8; 8]);

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    bsp.select_lump::<u8>(LumpId::Planes).unwrap();
    assert_eq!(bsp.element_count(), 1000);

    // Short reads are reported, not raised
    let mut out = vec![0u8; 1000];
    assert_eq!(bsp.read_elements(&mut out, 0).unwrap(), 8);
    assert_eq!(bsp.remaining_read(), 992);
    assert_eq!(bsp.get_all_elements::<u8>().unwrap(), vec![9u8; 8]);
    assert_eq!(bsp.get_element::<u8>(500).unwrap(), None);
}

#[test]
fn test_huge_game_lump_count() {
    let mut directory = Directory::new(ByteOrder::Little, DirectoryLayout::Standard);
    directory.lumps[LumpId::GameLump.index()] = LumpDescriptor::new(DIRECTORY_SIZE as i32, 8, 0);
    let mut payload = i32::MAX.to_le_bytes().to_vec();
    payload.extend_from_slice(&[0u8; 4]);
    let temp_file = map_from_directory(&directory, &payload);

    let bsp = BspFile::open(temp_file.path()).unwrap();
    assert_eq!(bsp.game_lump_count(), i32::MAX);
    assert!(bsp.all_game_lumps().is_empty());
}

#[test]
fn test_vis_lump_inside_header() {
    let mut directory = Directory::new(ByteOrder::Little, DirectoryLayout::Standard);
    // Points at the ident: reads garbage but stays in bounds
    directory.lumps[LumpId::Visibility.index()] = LumpDescriptor::new(0, 4, 0);
    let temp_file = map_from_directory(&directory, &[]);

    let mut bsp = BspFile::open(temp_file.path()).unwrap();
    let count = bsp.get_vis_cluster_count().unwrap();
    assert_eq!(count, i32::from_le_bytes(*b"VBSP"));
    assert!(bsp.get_vis_data().unwrap().is_empty());
}

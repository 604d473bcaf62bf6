//! Generate seed corpus for fuzzing

use bsplump_rs::bsp::GAME_LUMP_STATIC_PROPS;
use bsplump_rs::{Brush, BspWriter, ByteOrder, DirectoryLayout, LumpId, Vector};
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_directory_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Seed 1: Directory only
    {
        let path = format!("{}/seed_empty.bsp", corpus_dir);
        BspWriter::create(&path)?.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 2: Entities, vertexes and brushes
    {
        let path = format!("{}/seed_records.bsp", corpus_dir);
        let mut writer = BspWriter::create(&path)?;
        writer.add_lump(LumpId::Entities, 0, b"{\n\"classname\" \"worldspawn\"\n}\n\0")?;
        writer.add_records(LumpId::Vertexes, 0, &[Vector::new(0.0, 0.0, 0.0); 8])?;
        writer.add_records(
            LumpId::Brushes,
            0,
            &[Brush {
                first_side: 0,
                num_sides: 6,
                contents: 1,
            }; 4],
        )?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 3: Big-endian with visibility and game lumps
    {
        let path = format!("{}/seed_big_endian.bsp", corpus_dir);
        let mut writer = BspWriter::create(&path)?.with_byte_order(ByteOrder::Big);
        let mut vis = 2i32.to_be_bytes().to_vec();
        for offset in [20i32, 24, 28, 32] {
            vis.extend_from_slice(&offset.to_be_bytes());
        }
        writer.add_lump(LumpId::Visibility, 0, &vis)?;
        writer.add_game_lump(GAME_LUMP_STATIC_PROPS, 10, 0, &[0u8; 32]);
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 4: Left 4 Dead 2 descriptor layout
    {
        let path = format!("{}/seed_l4d2.bsp", corpus_dir);
        let mut writer = BspWriter::create(&path)?
            .with_format_version(21)
            .with_layout(DirectoryLayout::Left4Dead2);
        writer.add_lump(LumpId::Entities, 0, b"{}\0\0")?;
        writer.add_lump(LumpId::Planes, 0, &[0u8; 40])?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    println!("\nSeed corpus generated in {}", corpus_dir);
    Ok(())
}

#![no_main]

use bsplump_rs::{Brush, BspFile, LumpId, Vector, HEADER_LUMPS};
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Write fuzz data to temporary file
    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }

    // Opening must never panic, whatever the header says
    let mut bsp = match BspFile::open(temp_file.path()) {
        Ok(bsp) => bsp,
        Err(_) => return,
    };

    let _ = bsp.check_ident();
    let _ = bsp.get_vis_cluster_count();
    let _ = bsp.get_vis_data();

    let ids: Vec<i32> = bsp.all_game_lumps().iter().map(|g| g.id).collect();
    for id in ids {
        let _ = bsp.read_game_lump(id);
    }

    // Walk every slot, including one past the end
    for id in 0..=HEADER_LUMPS {
        if bsp.select_lump::<Vector>(id).is_err() {
            continue;
        }
        let mut out = [Vector::default(); 8];
        let _ = bsp.read_elements(&mut out, 3);
        let _ = bsp.get_element::<Vector>(u64::MAX);
        let _ = bsp.get_all_elements::<u8>();
    }

    // Writes stay inside the selected lump
    if bsp.select_lump::<Brush>(LumpId::Brushes).is_ok() {
        let _ = bsp.write_elements(&[Brush::default(); 4], 1);
        let _ = bsp.set_element(&Brush::default(), 2);
    }
});

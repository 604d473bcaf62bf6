use anyhow::{Context, Result};
use bsplump_rs::{AccessorConfig, BackupStatus, Brush, BspFile, LumpId, HEADER_LUMPS};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Inspect the lump directory of a BSP map file
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Map file to inspect
    map: PathBuf,

    /// Accessor config (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Back up the map before opening it
    #[arg(long)]
    backup: bool,

    /// Backup suffix, overriding the config
    #[arg(long)]
    suffix: Option<String>,

    /// Report the element count of this lump read as raw bytes
    #[arg(long)]
    lump: Option<usize>,

    /// Print each brush's side count
    #[arg(long)]
    brushes: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => AccessorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AccessorConfig::default(),
    };
    if let Some(suffix) = &args.suffix {
        config.backup.suffix = suffix.clone();
    }

    let mut bsp = BspFile::open_with(&args.map, &config)
        .with_context(|| format!("failed to open {}", args.map.display()))?;

    let backup = if args.backup {
        Some(bsp.backup_with_config().context("backup failed")?)
    } else {
        None
    };

    let vis_clusters = bsp.get_vis_cluster_count().context("failed to read visibility header")?;

    let lump_elements = match args.lump {
        Some(id) => Some(bsp.select_lump::<u8>(id)?.element_count),
        None => None,
    };

    let brushes = if args.brushes {
        bsp.select_lump::<Brush>(LumpId::Brushes)?;
        bsp.get_all_elements::<Brush>()?
    } else {
        Vec::new()
    };

    if args.json {
        let report = json!({
            "path": bsp.path(),
            "ident": bsp.check_ident(),
            "byte_order": bsp.byte_order(),
            "layout": bsp.layout(),
            "version": bsp.format_version(),
            "revision": bsp.map_revision(),
            "directory": bsp.directory(),
            "vis_clusters": vis_clusters,
            "game_lumps": bsp.game_lump_directory(),
            "lump_elements": lump_elements,
            "brush_sides": brushes.iter().map(|b| b.num_sides).collect::<Vec<_>>(),
            "backup": backup.as_ref().map(backup_summary),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(status) = &backup {
        println!("{}", backup_summary(status));
    }

    println!("{}", bsp.path().display());
    println!(
        "  ident {:?} ({:?}, {:?} layout), version {}, revision {}",
        bsp.check_ident(),
        bsp.byte_order(),
        bsp.layout(),
        bsp.format_version(),
        bsp.map_revision()
    );

    println!("  lumps:");
    for id in 0..HEADER_LUMPS {
        let lump = bsp.directory().lumps[id];
        if lump.is_empty() {
            continue;
        }
        let name = LumpId::from_index(id).map(LumpId::name).unwrap_or("?");
        println!(
            "    {:2} {:<28} offset {:>10} length {:>10} version {:>2} tag {}",
            id,
            name,
            lump.offset,
            lump.length,
            lump.version,
            hex::encode(lump.tag)
        );
    }

    println!("  vis clusters: {}", vis_clusters);
    println!("  game lumps: {}", bsp.game_lump_count());
    for entry in bsp.all_game_lumps() {
        println!(
            "    {} version {} flags {:#06x} offset {} length {}",
            entry.name(),
            entry.version,
            entry.flags,
            entry.offset,
            entry.length
        );
    }

    if let (Some(id), Some(count)) = (args.lump, lump_elements) {
        println!("  lump {}: {} bytes", id, count);
    }

    for (index, brush) in brushes.iter().enumerate() {
        println!("  brush {}: {} sides", index, brush.num_sides);
    }

    Ok(())
}

fn backup_summary(status: &BackupStatus) -> String {
    match status {
        BackupStatus::Copied(report) => format!(
            "backed up {} bytes to {} (crc32 {:08x})",
            report.bytes_copied,
            report.path.display(),
            report.crc32
        ),
        BackupStatus::AlreadyExists(path) => {
            format!("backup {} already exists, left untouched", path.display())
        }
    }
}

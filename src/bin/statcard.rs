use anyhow::Context;
use clap::Parser;
use statcard::export::{self, DownloadAsset};
use statcard::{default_painter, LayoutConfig, ShareCard, StatsSnapshot};
use std::fs;
use std::path::PathBuf;

/// Render a rating-stats snapshot into a shareable story card.
#[derive(Parser, Debug)]
#[command(name = "statcard", version)]
struct Args {
    /// Stats document (`{"rating_stats": {...}}`)
    snapshot: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "out")]
    out: PathBuf,

    /// JSON layout overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the background texture
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Only write the 1x preview
    #[arg(long)]
    preview_only: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let json = fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading {}", args.snapshot.display()))?;
    let snapshot = StatsSnapshot::from_json(&json)?;
    let config = match &args.config {
        Some(path) => LayoutConfig::from_path(path)?,
        None => LayoutConfig::default(),
    };

    let card = ShareCard::new(&snapshot, config, default_painter())?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let preview = card.preview(args.seed)?;
    let preview_asset = DownloadAsset {
        file_name: "preview.png".to_string(),
        width: preview.width(),
        height: preview.height(),
        bytes: export::encode_png(&preview)?,
    };
    drop(preview);
    let path = export::publish(&preview_asset, &args.out)?;
    println!("preview: {}", path.display());

    if !args.preview_only {
        let outcome = card.spawn_export(args.seed, Some(args.out.clone()))?.wait()?;
        if let Some(path) = outcome.published {
            println!(
                "export: {} ({}x{})",
                path.display(),
                outcome.asset.width,
                outcome.asset.height
            );
        }
    }
    Ok(())
}

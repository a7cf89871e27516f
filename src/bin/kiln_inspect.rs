//! kiln-inspect: report the shape of a proxy archive without converting it
//!
//! Usage:
//!   kiln-inspect lipd.json
//!
//! Prints the classification tag plus a structure summary (top-level type,
//! first keys, per-key value types). Useful for deciding how to handle an
//! archive the converter rejects.

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::Parser;
use kiln::convert::classify;
use kiln::ConvertConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kiln-inspect")]
#[command(about = "Classify a proxy archive and summarize its structure", long_about = None)]
struct Args {
    /// Input archive (JSON)
    input: PathBuf,

    /// Number of top-level keys to report
    #[arg(long)]
    summary_keys: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = ConvertConfig::default();
    if let Some(keys) = args.summary_keys {
        config.summary_keys = keys;
    }

    let value = kiln::parse_input(&args.input)?;
    let (shape, summary) = classify(&value, &config);

    println!("shape: {shape}");
    println!("{summary}");
    Ok(())
}

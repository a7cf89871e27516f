//! kiln-convert: normalize a proxy archive into a canonical Parquet table
//!
//! Usage:
//!   # Convert an archive, writing the verified table
//!   kiln-convert lipd.json proxies.parquet
//!
//!   # Accept an extra proxy variable name as a value column
//!   kiln-convert --value-names fluorescence lipd.json proxies.parquet
//!
//! Exit code 0 on success, 1 on any fatal error. Per-record diagnostics go
//! to stderr either way.

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use kiln::{ConvertConfig, Diagnostics};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "kiln-convert")]
#[command(about = "Normalize a proxy archive into a canonical columnar table", long_about = None)]
struct Args {
    /// Input archive (JSON)
    input: PathBuf,

    /// Output table (Parquet)
    output: PathBuf,

    /// Comma-separated extra proxy variable names to accept as value columns
    #[arg(long)]
    value_names: Option<String>,

    /// Number of top-level keys reported in structure summaries
    #[arg(long)]
    summary_keys: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut config = ConvertConfig::default();
    if let Some(names) = args.value_names {
        config.extra_value_names = names
            .split(',')
            .map(|name| name.trim().to_lowercase())
            .collect();
    }
    if let Some(keys) = args.summary_keys {
        config.summary_keys = keys;
    }

    match kiln::convert_file(&args.input, &args.output, &config) {
        Ok(report) => {
            print_diagnostics(&report.diagnostics);
            println!(
                "accepted {} of {} records ({} skipped)",
                report.accepted,
                report.total,
                report.skipped()
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            print_diagnostics(&failure.report.diagnostics);
            eprintln!("error: {}", failure.error);
            ExitCode::FAILURE
        }
    }
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
}

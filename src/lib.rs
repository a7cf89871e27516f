//! # Kiln - proxy archive normalization
//!
//! A library for converting heterogeneous paleoclimate proxy archives
//! (LiPD-style nested record trees, column-oriented proxy databases,
//! already-tabular row dumps) into one canonical columnar table, persisted
//! as Parquet and verified by a round-trip check.
//!
//! ## Pipeline
//!
//! - **inspect**: classify an opaque blob into a known shape
//! - **route**: pick the extraction strategy, or fail on unknown shapes
//! - **extract**: pull fields out of each record through fallback paths
//! - **normalize**: clean series, wrap longitudes, surface defaults
//! - **assemble**: merge into an ordered table with unique pids
//! - **verify**: reload the persisted artifact and compare
//!
//! ## Quick start
//!
//! ```rust
//! use kiln::convert::{assemble, extract_all, ConvertConfig};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let archive = json!({
//!     "D": {
//!         "Ocn-BermudaRise": {
//!             "geo": {"geometry": {"coordinates": [295.5, 32.3]}},
//!             "archiveType": "Coral",
//!             "paleoData": {"paleo0": {"measurementTable": {"t0": {"columns": {
//!                 "c0": {"variableName": "year", "values": [2000.0, 1999.0]},
//!                 "c1": {"variableName": "d18O", "values": [-3.2, -3.1]}
//!             }}}}}
//!         }
//!     }
//! });
//!
//! let extraction = extract_all(&archive, &ConvertConfig::default())?;
//! let table = assemble(extraction.records)?;
//!
//! assert_eq!(table.len(), 1);
//! assert_eq!(table.first().unwrap().ptype, "coral.d18o");
//! # Ok(())
//! # }
//! ```
//!
//! File-to-file conversion, including persistence and verification, goes
//! through [`convert_file`].

use serde_json::Value;
use std::path::Path;

pub mod convert;

// Re-export commonly used types for convenience
pub use convert::{
    assemble, extract_all, read_table, verify, write_table, CanonicalTable, ConvertConfig,
    ConvertError, Diagnostic, DiagnosticKind, Diagnostics, ProxyRecord, RunFailure, RunReport,
    RunStage,
};

/// Parse an input archive from disk.
///
/// Tries SIMD-accelerated parsing first and falls back to serde_json on
/// malformed-for-simd input.
pub fn parse_input(path: &Path) -> Result<Value, ConvertError> {
    let mut content = std::fs::read(path)?;

    match simd_json::to_owned_value(&mut content) {
        Ok(parsed) => {
            let text = simd_json::to_string(&parsed)
                .map_err(|e| ConvertError::Parse(e.to_string()))?;
            serde_json::from_str(&text).map_err(|e| ConvertError::Parse(e.to_string()))
        }
        Err(_) => {
            // simd-json parses in place and may have scrambled the buffer.
            let content = std::fs::read(path)?;
            serde_json::from_slice(&content).map_err(|e| ConvertError::Parse(e.to_string()))
        }
    }
}

/// Main entry point: convert an archive file into a verified Parquet table.
///
/// On success the report carries the accepted/skipped counts and every
/// per-record diagnostic. On failure the diagnostics gathered so far ride
/// along in the [`RunFailure`]. A schema violation aborts before anything is
/// written, so a failed run never leaves a partial artifact behind.
pub fn convert_file(
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
) -> Result<RunReport, RunFailure> {
    let mut report = RunReport::default();

    let value = match parse_input(input) {
        Ok(value) => value,
        Err(error) => return Err(fail(report, error)),
    };

    let extraction = match convert::extract_all(&value, config) {
        Ok(extraction) => extraction,
        Err(error) => return Err(fail(report, error)),
    };
    report.total = extraction.total;
    report.diagnostics = extraction.diagnostics;

    report.stage = RunStage::Assembling;
    log::info!("stage: {}", RunStage::Assembling);
    let table = match convert::assemble(extraction.records) {
        Ok(table) => table,
        Err(error) => return Err(fail(report, error)),
    };

    if let Err(error) = convert::write_table(&table, output) {
        return Err(fail(report, error));
    }

    report.stage = RunStage::Verifying;
    log::info!("stage: {}", RunStage::Verifying);
    if let Err(error) = convert::verify(&table, output) {
        return Err(fail(report, error));
    }

    report.accepted = table.len();
    report.stage = RunStage::Done;
    log::info!(
        "stage: {}; accepted {} of {} records ({} skipped)",
        RunStage::Done,
        report.accepted,
        report.total,
        report.skipped()
    );
    Ok(report)
}

fn fail(mut report: RunReport, error: ConvertError) -> RunFailure {
    report.stage = RunStage::Failed;
    log::error!("run failed: {error}");
    RunFailure { error, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kiln-lib-{}-{name}", std::process::id()))
    }

    fn write_json(name: &str, value: &Value) -> PathBuf {
        let path = temp_path(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    fn coral_archive() -> Value {
        json!({"D": {
            "A": {
                "geo": {"geometry": {"coordinates": [295.5, 32.3]}},
                "archiveType": "coral",
                "paleoData": {"paleo0": {"measurementTable": {"t0": {"columns": {
                    "c0": {"variableName": "year", "values": [2000.0, 1999.0]},
                    "c1": {"variableName": "d18O", "values": [-3.2, -3.1]}
                }}}}}
            },
            "B": {"archiveType": "coral"}
        }})
    }

    #[test]
    fn test_convert_file_end_to_end() {
        let input = write_json("e2e-input.json", &coral_archive());
        let output = temp_path("e2e-output.parquet");

        let report = convert_file(&input, &output, &ConvertConfig::default()).unwrap();
        assert_eq!(report.stage, RunStage::Done);
        assert_eq!(report.total, 2);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.accepted + report.skipped(), report.total);

        let rows = read_table(&output).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pid, "A");
        assert_eq!(rows[0].lat, Some(32.3));
        assert_eq!(rows[0].lon, Some(295.5));
        assert_eq!(rows[0].ptype, "coral.d18o");
        assert_eq!(rows[0].time, vec![2000.0, 1999.0]);
        assert_eq!(rows[0].value, vec![-3.2, -3.1]);

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&output);
    }

    #[test]
    fn test_duplicate_pid_aborts_without_artifact() {
        let rows = json!([
            {"pid": "A", "time": [2000.0], "value": [-3.2], "ptype": "coral.d18o"},
            {"pid": "A", "time": [1999.0], "value": [-3.1], "ptype": "coral.d18o"}
        ]);
        let input = write_json("dup-input.json", &rows);
        let output = temp_path("dup-output.parquet");

        let failure = convert_file(&input, &output, &ConvertConfig::default()).unwrap_err();
        assert!(matches!(failure.error, ConvertError::SchemaViolation(_)));
        assert_eq!(failure.report.stage, RunStage::Failed);
        assert!(!output.exists());

        let _ = std::fs::remove_file(&input);
    }

    #[test]
    fn test_unsupported_input_keeps_diagnostic_summary() {
        let input = write_json("unsupported-input.json", &json!("just a string"));
        let output = temp_path("unsupported-output.parquet");

        let failure = convert_file(&input, &output, &ConvertConfig::default()).unwrap_err();
        match failure.error {
            ConvertError::UnsupportedFormat { summary } => {
                assert_eq!(summary.type_name, "string");
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }

        let _ = std::fs::remove_file(&input);
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let input = write_json("idem-input.json", &coral_archive());
        let first = temp_path("idem-first.parquet");
        let second = temp_path("idem-second.parquet");

        convert_file(&input, &first, &ConvertConfig::default()).unwrap();
        convert_file(&input, &second, &ConvertConfig::default()).unwrap();

        let first_rows = read_table(&first).unwrap();
        let second_rows = read_table(&second).unwrap();
        assert_eq!(first_rows, second_rows);

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&first);
        let _ = std::fs::remove_file(&second);
    }
}

//! Proxy-archive conversion pipeline.
//!
//! Turns a loosely-schematized proxy archive into the canonical table the
//! downstream reconstruction engine consumes:
//!
//! blob -> inspect -> route -> {per-record: extract -> normalize} ->
//! assemble -> persist -> verify
//!
//! A single bad record never aborts a run; it is skipped and the reason
//! recorded. Fatal errors are table-level: an unrecognized input shape, a
//! broken table invariant, or an artifact that fails the round-trip check.

pub mod assemble;
pub mod error;
pub mod extract;
pub mod inspect;
pub mod normalize;
pub mod route;
pub mod types;
pub mod verify;
pub mod writer;

pub use assemble::assemble;
pub use error::{ConvertError, RunFailure};
pub use inspect::{classify, Shape, StructureSummary};
pub use route::{route, Strategy};
pub use types::{
    CanonicalTable, ConvertConfig, Diagnostic, DiagnosticKind, Diagnostics, ProxyRecord,
    RunReport, RunStage,
};
pub use verify::{read_table, verify};
pub use writer::{table_schema, write_table};

/// Extraction outcome for a whole archive: every input record is accounted
/// for, either as a normalized record or as a skip diagnostic, so
/// `records.len() + diagnostics.skipped_count() == total`.
#[derive(Debug)]
pub struct Extraction {
    pub total: usize,
    pub records: Vec<ProxyRecord>,
    pub diagnostics: Diagnostics,
}

/// Run inspection, routing, extraction, and normalization over a parsed
/// archive. Fails only on an unrecognized input shape; per-record problems
/// accumulate as diagnostics.
pub fn extract_all(
    value: &serde_json::Value,
    config: &ConvertConfig,
) -> Result<Extraction, ConvertError> {
    log::info!("stage: {}", RunStage::Inspecting);
    let (shape, summary) = inspect::classify(value, config);
    log::debug!("classified input as {shape}: {summary}");

    log::info!("stage: {}", RunStage::Routing);
    let strategy = route::route(shape, &summary)?;

    log::info!("stage: {}", RunStage::Extracting);
    let raw = match strategy {
        Strategy::NestedRecords => extract::nested_records(value, config),
        Strategy::PassThroughRows => extract::tabular_rows(value),
        Strategy::ColumnOriented => extract::column_rows(value),
    };
    let total = raw.len();

    log::info!("stage: {}", RunStage::Normalizing);
    let mut diagnostics = Diagnostics::new();
    let mut records = Vec::with_capacity(total);
    for (pid, outcome) in raw {
        match outcome.and_then(normalize::normalize) {
            Ok((record, notes)) => {
                for note in &notes {
                    log::warn!("{note}");
                }
                diagnostics.extend(notes);
                records.push(record);
            }
            Err(reason) => {
                log::debug!("skipping {pid}: {reason}");
                diagnostics.push(Diagnostic::skipped(pid, reason));
            }
        }
    }

    Ok(Extraction {
        total,
        records,
        diagnostics,
    })
}

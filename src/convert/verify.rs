//! Round-trip check of the persisted artifact.
//!
//! The artifact is reloaded through the same arrow reader the downstream
//! consumer uses and compared against the in-memory table. Any disagreement
//! means the artifact cannot be trusted.

use crate::convert::error::ConvertError;
use crate::convert::types::{CanonicalTable, ProxyRecord};
use arrow::array::{Array, Float64Array, ListArray, StringArray};
use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

static REQUIRED_COLUMNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["pid", "lat", "lon", "elev", "time", "value", "ptype"]
        .into_iter()
        .collect()
});

/// Check the persisted artifact against the in-memory table: row count,
/// required column set, and pid/lat/lon of the first and last row.
pub fn verify(table: &CanonicalTable, path: &Path) -> Result<(), ConvertError> {
    let (columns, rows) = read_artifact(path)?;

    let found: HashSet<&str> = columns.iter().map(String::as_str).collect();
    if found != *REQUIRED_COLUMNS {
        let mut names = columns.clone();
        names.sort();
        return Err(ConvertError::VerificationMismatch(format!(
            "column set mismatch: artifact has [{}]",
            names.join(", ")
        )));
    }

    if rows.len() != table.len() {
        return Err(ConvertError::VerificationMismatch(format!(
            "row count mismatch: artifact has {}, table has {}",
            rows.len(),
            table.len()
        )));
    }

    // Deterministic sample: first and last row.
    let sample = [0, table.len() - 1];
    for idx in sample {
        let expected = &table.records()[idx];
        let actual = &rows[idx];
        if actual.pid != expected.pid {
            return Err(ConvertError::VerificationMismatch(format!(
                "row {idx}: pid '{}' in artifact, '{}' in table",
                actual.pid, expected.pid
            )));
        }
        if !opt_eq(actual.lat, expected.lat) {
            return Err(ConvertError::VerificationMismatch(format!(
                "row {idx} ('{}'): lat {:?} in artifact, {:?} in table",
                expected.pid, actual.lat, expected.lat
            )));
        }
        if !opt_eq(actual.lon, expected.lon) {
            return Err(ConvertError::VerificationMismatch(format!(
                "row {idx} ('{}'): lon {:?} in artifact, {:?} in table",
                expected.pid, actual.lon, expected.lon
            )));
        }
    }

    Ok(())
}

/// Reload a persisted table the way a downstream consumer would.
pub fn read_table(path: &Path) -> Result<Vec<ProxyRecord>, ConvertError> {
    let (_, rows) = read_artifact(path)?;
    Ok(rows)
}

fn read_artifact(path: &Path) -> Result<(Vec<String>, Vec<ProxyRecord>), ConvertError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let mut rows = Vec::new();
    for batch in builder.build()? {
        let batch = batch?;
        read_batch(&batch, &mut rows)?;
    }
    Ok((columns, rows))
}

fn read_batch(batch: &RecordBatch, rows: &mut Vec<ProxyRecord>) -> Result<(), ConvertError> {
    let pid = string_column(batch, "pid")?;
    let lat = f64_column(batch, "lat")?;
    let lon = f64_column(batch, "lon")?;
    let elev = f64_column(batch, "elev")?;
    let ptype = string_column(batch, "ptype")?;
    let time = list_column(batch, "time")?;
    let value = list_column(batch, "value")?;

    for row in 0..batch.num_rows() {
        rows.push(ProxyRecord {
            pid: pid.value(row).to_string(),
            lat: nullable_f64(lat, row),
            lon: nullable_f64(lon, row),
            elev: elev.value(row),
            ptype: ptype.value(row).to_string(),
            time: list_values(time, row)?,
            value: list_values(value, row)?,
        });
    }
    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, ConvertError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| malformed(name, "Utf8"))
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, ConvertError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| malformed(name, "Float64"))
}

fn list_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ListArray, ConvertError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<ListArray>())
        .ok_or_else(|| malformed(name, "List"))
}

fn list_values(list: &ListArray, row: usize) -> Result<Vec<f64>, ConvertError> {
    let values = list.value(row);
    let floats = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| malformed("list item", "Float64"))?;
    Ok(floats.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn nullable_f64(column: &Float64Array, row: usize) -> Option<f64> {
    if column.is_null(row) {
        None
    } else {
        Some(column.value(row))
    }
}

fn malformed(column: &str, expected: &str) -> ConvertError {
    ConvertError::VerificationMismatch(format!(
        "artifact column '{column}' is missing or not {expected}"
    ))
}

fn opt_eq(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a.is_nan() && b.is_nan()) || a == b,
        _ => false,
    }
}

//! Per-record field extraction.
//!
//! Archives in the wild disagree about where coordinates, elevation, and the
//! measurement table live, so every field is probed through an ordered list
//! of candidate lookup paths. The first path that resolves to a usable value
//! wins; a record that yields no usable series is skipped with a reason, and
//! never aborts the run.

use crate::convert::types::ConvertConfig;
use serde_json::{Map, Value};

/// Variable names (lower-case) that identify the time axis of a
/// measurement table.
const TIME_NAMES: &[&str] = &["year", "age", "time", "yr"];

/// Variable names (lower-case) that identify a proxy measurement.
const VALUE_NAMES: &[&str] = &[
    "d18o",
    "srca",
    "trw",
    "mxd",
    "dd",
    "temperature",
    "temp",
    "accumulation",
    "thickness",
    "mgca",
    "uk37",
    "tex86",
];

/// One hop of a lookup path.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Key(&'static str),
    Index(usize),
}

/// Ordered candidates for the longitude field.
const LON_PATHS: &[&[Step]] = &[
    &[
        Step::Key("geo"),
        Step::Key("geometry"),
        Step::Key("coordinates"),
        Step::Index(0),
    ],
    &[Step::Key("geo"), Step::Key("longitude")],
    &[Step::Key("geo"), Step::Key("meanLon")],
];

/// Ordered candidates for the latitude field.
const LAT_PATHS: &[&[Step]] = &[
    &[
        Step::Key("geo"),
        Step::Key("geometry"),
        Step::Key("coordinates"),
        Step::Index(1),
    ],
    &[Step::Key("geo"), Step::Key("latitude")],
    &[Step::Key("geo"), Step::Key("meanLat")],
];

/// Ordered candidates for the elevation field. Three-element coordinate
/// arrays carry elevation in the last slot.
const ELEV_PATHS: &[&[Step]] = &[
    &[
        Step::Key("geo"),
        Step::Key("geometry"),
        Step::Key("coordinates"),
        Step::Index(2),
    ],
    &[Step::Key("geo"), Step::Key("elevation")],
    &[Step::Key("geo"), Step::Key("meanElev")],
];

/// Walk a lookup path through a value tree.
pub fn probe<'a>(value: &'a Value, path: &[Step]) -> Option<&'a Value> {
    let mut current = value;
    for step in path {
        current = match step {
            Step::Key(key) => current.get(*key)?,
            Step::Index(idx) => current.get(*idx)?,
        };
    }
    Some(current)
}

/// A record as extracted, before normalization: coordinates still optional,
/// archive and variable not yet fused into a ptype, series not yet cleaned.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub pid: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub elev: Option<f64>,
    /// Lower-cased archive tag, empty when absent.
    pub archive: String,
    /// Lower-cased proxy variable name; `None` when no value column matched
    /// the vocabulary.
    pub variable: Option<String>,
    pub time: Vec<f64>,
    pub value: Vec<f64>,
}

/// Extract every record of a `{"D": {pid: record}}` archive. Returns one
/// entry per input record; failures carry the skip reason.
pub fn nested_records(
    root: &Value,
    config: &ConvertConfig,
) -> Vec<(String, Result<RawRecord, String>)> {
    let Some(archive) = root.get("D").and_then(Value::as_object) else {
        return Vec::new();
    };

    archive
        .iter()
        .map(|(pid, record)| (pid.clone(), extract_record(pid, record, config)))
        .collect()
}

/// Read rows that already carry canonical column names.
pub fn tabular_rows(root: &Value) -> Vec<(String, Result<RawRecord, String>)> {
    let Some(rows) = root.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .enumerate()
        .map(|(idx, row)| match row_record(row) {
            Ok(raw) => (raw.pid.clone(), Ok(raw)),
            Err(reason) => (format!("row{idx}"), Err(reason)),
        })
        .collect()
}

/// Transpose a `{column: [per-record values]}` mapping into rows, indexed by
/// the id column.
pub fn column_rows(root: &Value) -> Vec<(String, Result<RawRecord, String>)> {
    let Some(table) = root.as_object() else {
        return Vec::new();
    };

    let ids = table
        .get("pid")
        .or_else(|| table.get("proxyid"))
        .and_then(Value::as_array);

    let Some(ids) = ids else {
        // No id column: every row is countable but unusable.
        let row_count = table
            .values()
            .find_map(Value::as_array)
            .map_or(0, |column| column.len());
        return (0..row_count)
            .map(|idx| (format!("row{idx}"), Err("missing pid".to_string())))
            .collect();
    };

    ids.iter()
        .enumerate()
        .map(|(idx, id)| match id.as_str() {
            Some(pid) => (pid.to_string(), column_record(table, pid, idx)),
            None => (format!("row{idx}"), Err("missing pid".to_string())),
        })
        .collect()
}

/// Pull one record out of a nested archive entry.
fn extract_record(pid: &str, record: &Value, config: &ConvertConfig) -> Result<RawRecord, String> {
    let lon = first_number(record, LON_PATHS);
    let lat = first_number(record, LAT_PATHS);
    let elev = first_number(record, ELEV_PATHS);

    let archive = record
        .get("archiveType")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    let Some(columns) = measurement_columns(record) else {
        return Err("no measurement table".to_string());
    };

    let scan = scan_columns(columns, config);
    let Some(time) = scan.time else {
        return Err("no time column".to_string());
    };
    let (value, variable) = match scan.value {
        Some(value) => (value, scan.variable),
        None => match scan.fallback {
            Some(value) => (value, None),
            None => return Err("no value column".to_string()),
        },
    };

    Ok(RawRecord {
        pid: pid.to_string(),
        lat,
        lon,
        elev,
        archive,
        variable,
        time,
        value,
    })
}

fn row_record(row: &Value) -> Result<RawRecord, String> {
    let row = row.as_object().ok_or_else(|| "row is not an object".to_string())?;

    let pid = row
        .get("pid")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing pid".to_string())?;

    let time = row
        .get("time")
        .and_then(Value::as_array)
        .map(|v| numeric_values(v))
        .ok_or_else(|| "missing time column".to_string())?;
    let value = row
        .get("value")
        .and_then(Value::as_array)
        .map(|v| numeric_values(v))
        .ok_or_else(|| "missing value column".to_string())?;

    let (archive, variable) =
        split_ptype(row.get("ptype").and_then(Value::as_str).unwrap_or(""));

    Ok(RawRecord {
        pid: pid.to_string(),
        lat: row.get("lat").and_then(Value::as_f64),
        lon: row.get("lon").and_then(Value::as_f64),
        elev: row.get("elev").and_then(Value::as_f64),
        archive,
        variable,
        time,
        value,
    })
}

fn column_record(
    table: &Map<String, Value>,
    pid: &str,
    idx: usize,
) -> Result<RawRecord, String> {
    let time = column_cell(table, "time", idx)
        .and_then(Value::as_array)
        .map(|v| numeric_values(v))
        .ok_or_else(|| "missing time column".to_string())?;
    let value = column_cell(table, "value", idx)
        .and_then(Value::as_array)
        .map(|v| numeric_values(v))
        .ok_or_else(|| "missing value column".to_string())?;

    let (archive, variable) = split_ptype(
        column_cell(table, "ptype", idx)
            .and_then(Value::as_str)
            .unwrap_or(""),
    );

    Ok(RawRecord {
        pid: pid.to_string(),
        lat: column_cell(table, "lat", idx).and_then(Value::as_f64),
        lon: column_cell(table, "lon", idx).and_then(Value::as_f64),
        elev: column_cell(table, "elev", idx).and_then(Value::as_f64),
        archive,
        variable,
        time,
        value,
    })
}

fn column_cell<'a>(table: &'a Map<String, Value>, key: &str, idx: usize) -> Option<&'a Value> {
    table.get(key).and_then(Value::as_array).and_then(|column| column.get(idx))
}

/// First candidate path that resolves to a number.
fn first_number(record: &Value, paths: &[&[Step]]) -> Option<f64> {
    paths
        .iter()
        .find_map(|path| probe(record, path).and_then(Value::as_f64))
}

/// Locate the column map of the first measurement table:
/// `paleoData` -> `paleo0` (or the first entry) -> `measurementTable` ->
/// first entry -> `columns`.
fn measurement_columns(record: &Value) -> Option<&Map<String, Value>> {
    let paleo_data = record.get("paleoData")?.as_object()?;
    let first_paleo = paleo_data
        .get("paleo0")
        .or_else(|| paleo_data.values().next())?
        .as_object()?;
    let tables = first_paleo.get("measurementTable")?.as_object()?;
    let table = tables.values().next()?.as_object()?;
    table.get("columns")?.as_object()
}

struct ColumnScan {
    time: Option<Vec<f64>>,
    value: Option<Vec<f64>>,
    variable: Option<String>,
    /// First non-time column, used when nothing matches the value vocabulary.
    fallback: Option<Vec<f64>>,
}

/// Scan the columns of a measurement table, case-insensitively, taking the
/// first match of each kind.
fn scan_columns(columns: &Map<String, Value>, config: &ConvertConfig) -> ColumnScan {
    let mut scan = ColumnScan {
        time: None,
        value: None,
        variable: None,
        fallback: None,
    };

    for column in columns.values() {
        let Some(column) = column.as_object() else {
            continue;
        };
        let name = column
            .get("variableName")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        let Some(values) = column.get("values").and_then(Value::as_array) else {
            continue;
        };

        if TIME_NAMES.contains(&name.as_str()) {
            if scan.time.is_none() {
                scan.time = Some(numeric_values(values));
            }
        } else if is_value_name(&name, config) {
            if scan.value.is_none() {
                scan.value = Some(numeric_values(values));
                scan.variable = Some(name);
            }
        } else if scan.fallback.is_none() && !values.is_empty() {
            scan.fallback = Some(numeric_values(values));
        }
    }

    scan
}

fn is_value_name(name: &str, config: &ConvertConfig) -> bool {
    VALUE_NAMES.contains(&name)
        || config.extra_value_names.iter().any(|extra| extra == name)
}

/// Non-numeric entries (nulls, strings) become NaN so that cleaning handles
/// them uniformly.
fn numeric_values(values: &[Value]) -> Vec<f64> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(f64::NAN))
        .collect()
}

/// Split an `"archive.variable"` tag back into its parts so a pass-through
/// row flows through the same ptype construction as an extracted record.
fn split_ptype(ptype: &str) -> (String, Option<String>) {
    match ptype.split_once('.') {
        Some((archive, variable)) if !variable.is_empty() => {
            (archive.to_lowercase(), Some(variable.to_lowercase()))
        }
        _ => (ptype.to_lowercase(), None),
    }
}

//! Shape classification for opaque input blobs.
//!
//! Classification only - no conversion happens here. The summary travels with
//! the classification so an unsupported shape can be reported with enough
//! context for manual handling.

use crate::convert::types::ConvertConfig;
use serde_json::{Map, Value};
use std::fmt;

/// The recognized input shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// An array of row objects already carrying canonical column names.
    Tabular,
    /// A `{"D": {pid: record, ...}}` archive of nested records.
    RecordMap,
    /// A `{column: [per-record values]}` mapping.
    ColumnMap,
    Unknown,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Tabular => "already-tabular",
            Shape::RecordMap => "nested-dict-with-records",
            Shape::ColumnMap => "dict-of-arrays",
            Shape::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// What the inspector saw: top-level type, entry count, and the first few
/// keys with the type of each value.
#[derive(Debug, Clone)]
pub struct StructureSummary {
    pub type_name: String,
    pub total_keys: usize,
    pub keys: Vec<(String, String)>,
}

impl fmt::Display for StructureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {} entries", self.type_name, self.total_keys)?;
        if !self.keys.is_empty() {
            let listed: Vec<String> = self
                .keys
                .iter()
                .map(|(key, type_name)| format!("{key}: {type_name}"))
                .collect();
            write!(f, "; first {}: {}", self.keys.len(), listed.join(", "))?;
        }
        Ok(())
    }
}

/// Classify a blob into one of the recognized shapes.
///
/// Never fails: an unrecognizable input yields `Shape::Unknown` together
/// with a summary describing what was actually found.
pub fn classify(value: &Value, config: &ConvertConfig) -> (Shape, StructureSummary) {
    let summary = summarize(value, config.summary_keys);
    let shape = match value {
        Value::Array(rows) => classify_rows(rows),
        Value::Object(map) => classify_map(map),
        _ => Shape::Unknown,
    };
    (shape, summary)
}

fn classify_rows(rows: &[Value]) -> Shape {
    if rows.is_empty() {
        return Shape::Unknown;
    }

    // Mostly objects, and the first one identifies its row.
    let object_count = rows.iter().filter(|v| v.is_object()).count();
    if object_count <= rows.len() / 2 {
        return Shape::Unknown;
    }

    let first_object = rows.iter().find_map(Value::as_object);
    match first_object {
        Some(row) if row.contains_key("pid") => Shape::Tabular,
        _ => Shape::Unknown,
    }
}

fn classify_map(map: &Map<String, Value>) -> Shape {
    if map.get("D").is_some_and(Value::is_object) {
        return Shape::RecordMap;
    }

    let array_count = map.values().filter(|v| v.is_array()).count();
    let id_like = ["pid", "proxyid", "lat"]
        .iter()
        .any(|key| map.contains_key(*key));
    if !map.is_empty() && array_count > map.len() / 2 && id_like {
        return Shape::ColumnMap;
    }

    Shape::Unknown
}

fn summarize(value: &Value, limit: usize) -> StructureSummary {
    match value {
        Value::Object(map) => StructureSummary {
            type_name: "object".to_string(),
            total_keys: map.len(),
            keys: map
                .iter()
                .take(limit)
                .map(|(key, v)| (key.clone(), type_name(v).to_string()))
                .collect(),
        },
        Value::Array(rows) => StructureSummary {
            type_name: "array".to_string(),
            total_keys: rows.len(),
            keys: rows
                .iter()
                .take(limit)
                .enumerate()
                .map(|(idx, v)| (idx.to_string(), type_name(v).to_string()))
                .collect(),
        },
        other => StructureSummary {
            type_name: type_name(other).to_string(),
            total_keys: 0,
            keys: Vec::new(),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ConvertConfig {
        ConvertConfig::default()
    }

    #[test]
    fn test_classify_record_map() {
        let input = json!({"D": {"A": {"archiveType": "coral"}}});
        let (shape, summary) = classify(&input, &config());
        assert_eq!(shape, Shape::RecordMap);
        assert_eq!(summary.type_name, "object");
        assert_eq!(summary.total_keys, 1);
    }

    #[test]
    fn test_classify_tabular_rows() {
        let input = json!([
            {"pid": "A", "time": [1.0], "value": [2.0]},
            {"pid": "B", "time": [1.0], "value": [3.0]}
        ]);
        let (shape, _) = classify(&input, &config());
        assert_eq!(shape, Shape::Tabular);
    }

    #[test]
    fn test_classify_column_map() {
        let input = json!({
            "pid": ["A", "B"],
            "lat": [10.0, 20.0],
            "time": [[1.0], [1.0]],
            "value": [[2.0], [3.0]]
        });
        let (shape, _) = classify(&input, &config());
        assert_eq!(shape, Shape::ColumnMap);
    }

    #[test]
    fn test_rows_without_pid_are_unknown() {
        let input = json!([{"name": "A"}, {"name": "B"}]);
        let (shape, _) = classify(&input, &config());
        assert_eq!(shape, Shape::Unknown);
    }

    #[test]
    fn test_scalar_is_unknown_with_summary() {
        let (shape, summary) = classify(&json!(42), &config());
        assert_eq!(shape, Shape::Unknown);
        assert_eq!(summary.type_name, "number");
        assert!(summary.keys.is_empty());
    }

    #[test]
    fn test_summary_reports_key_types() {
        let input = json!({"D": {"A": {}}, "meta": "pages2k", "version": 2});
        let (_, summary) = classify(&input, &config());
        assert_eq!(summary.total_keys, 3);
        assert!(summary
            .keys
            .contains(&("D".to_string(), "object".to_string())));
        assert!(summary
            .keys
            .contains(&("meta".to_string(), "string".to_string())));
    }

    #[test]
    fn test_summary_honors_key_limit() {
        let mut config = config();
        config.summary_keys = 2;
        let input = json!({"a": 1, "b": 2, "c": 3, "d": 4});
        let (_, summary) = classify(&input, &config);
        assert_eq!(summary.keys.len(), 2);
        assert_eq!(summary.total_keys, 4);
    }
}

//! Ordered merge of normalized records into the canonical table.

use crate::convert::error::ConvertError;
use crate::convert::types::{CanonicalTable, ProxyRecord};
use std::collections::HashSet;

/// Build the canonical table in first-seen order.
///
/// A duplicate pid or an empty record set is fatal: the run aborts and no
/// artifact is written. Partitioned callers must funnel their records through
/// a single `assemble` call so ordering and duplicate detection stay
/// deterministic.
pub fn assemble(records: Vec<ProxyRecord>) -> Result<CanonicalTable, ConvertError> {
    if records.is_empty() {
        return Err(ConvertError::SchemaViolation(
            "no records accepted".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for record in &records {
        if !seen.insert(record.pid.clone()) {
            return Err(ConvertError::SchemaViolation(format!(
                "duplicate pid '{}'",
                record.pid
            )));
        }
        if record.time.is_empty() || record.time.len() != record.value.len() {
            return Err(ConvertError::SchemaViolation(format!(
                "record '{}' has misaligned series ({} time, {} value)",
                record.pid,
                record.time.len(),
                record.value.len()
            )));
        }
    }

    Ok(CanonicalTable::new(records))
}

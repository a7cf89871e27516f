use serde::{Deserialize, Serialize};
use std::fmt;

/// One normalized proxy site - a row in the canonical table.
///
/// Constructed once by the extraction and normalization stages and never
/// mutated afterwards. `time` and `value` are always the same length and
/// never empty; `lon`, when present, lies in `[0, 360)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRecord {
    /// Unique site identifier.
    pub pid: String,

    /// Latitude in degrees, `-90..90`. Absent when the archive carries no
    /// usable coordinates.
    pub lat: Option<f64>,

    /// Longitude in degrees, wrapped into `[0, 360)`.
    pub lon: Option<f64>,

    /// Elevation in meters. Defaults to `0.0` when the archive has none.
    pub elev: f64,

    /// Two-part `"archive.variable"` tag, e.g. `"coral.d18o"`.
    pub ptype: String,

    /// Time axis (years).
    pub time: Vec<f64>,

    /// Measured values, aligned with `time`.
    pub value: Vec<f64>,
}

/// The assembled output table: proxy records in first-seen order with
/// pairwise-unique pids.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    records: Vec<ProxyRecord>,
}

impl CanonicalTable {
    /// Invariants are checked by the assembler, not here.
    pub(crate) fn new(records: Vec<ProxyRecord>) -> Self {
        CanonicalTable { records }
    }

    pub fn records(&self) -> &[ProxyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&ProxyRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&ProxyRecord> {
        self.records.last()
    }
}

/// Whether a diagnostic entry dropped the record or merely degraded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// The record was excluded from the table.
    Skipped,
    /// The record was kept, but a field was defaulted or left unresolved.
    Degraded,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Skipped => write!(f, "skipped"),
            DiagnosticKind::Degraded => write!(f, "degraded"),
        }
    }
}

/// A single per-record finding surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub pid: String,
    pub kind: DiagnosticKind,
    pub reason: String,
}

impl Diagnostic {
    pub fn skipped(pid: impl Into<String>, reason: impl Into<String>) -> Self {
        Diagnostic {
            pid: pid.into(),
            kind: DiagnosticKind::Skipped,
            reason: reason.into(),
        }
    }

    pub fn degraded(pid: impl Into<String>, reason: impl Into<String>) -> Self {
        Diagnostic {
            pid: pid.into(),
            kind: DiagnosticKind::Degraded,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.pid, self.reason)
    }
}

/// Append-only accumulator of per-record findings, owned by a single run.
///
/// Callers that partition the record set across workers give each worker its
/// own accumulator and [`merge`](Diagnostics::merge) them at the end; there is
/// no shared mutable collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, entry: Diagnostic) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: Vec<Diagnostic>) {
        self.entries.extend(entries);
    }

    /// Fold another accumulator into this one, preserving its entry order.
    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records excluded from the table.
    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Skipped)
            .count()
    }
}

/// Configuration for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// How many top-level keys a structure summary reports.
    pub summary_keys: usize,

    /// Extra proxy variable names (lower-case) accepted as value columns,
    /// on top of the built-in vocabulary.
    pub extra_value_names: Vec<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            summary_keys: 10,
            extra_value_names: vec![],
        }
    }
}

/// Where a run currently is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Inspecting,
    Routing,
    Extracting,
    Normalizing,
    Assembling,
    Verifying,
    Done,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Inspecting => "inspecting",
            RunStage::Routing => "routing",
            RunStage::Extracting => "extracting",
            RunStage::Normalizing => "normalizing",
            RunStage::Assembling => "assembling",
            RunStage::Verifying => "verifying",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Outcome of a run: counts plus every per-record finding.
///
/// `accepted + skipped == total` holds for every completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stage: RunStage,
    pub total: usize,
    pub accepted: usize,
    pub diagnostics: Diagnostics,
}

impl RunReport {
    pub fn skipped(&self) -> usize {
        self.diagnostics.skipped_count()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        RunReport {
            stage: RunStage::Inspecting,
            total: 0,
            accepted: 0,
            diagnostics: Diagnostics::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_merge_preserves_order() {
        let mut left = Diagnostics::new();
        left.push(Diagnostic::skipped("A", "no measurement table"));

        let mut right = Diagnostics::new();
        right.push(Diagnostic::degraded("B", "elevation missing, defaulted to 0.0"));
        right.push(Diagnostic::skipped("C", "empty series after cleaning"));

        left.merge(right);

        let pids: Vec<&str> = left.iter().map(|d| d.pid.as_str()).collect();
        assert_eq!(pids, vec!["A", "B", "C"]);
        assert_eq!(left.skipped_count(), 2);
    }

    #[test]
    fn test_skipped_count_ignores_degraded_entries() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::degraded("A", "proxy variable unresolved"));
        assert_eq!(diags.skipped_count(), 0);
        assert_eq!(diags.len(), 1);
    }
}

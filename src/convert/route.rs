//! Dispatch from a classified shape to an extraction strategy.

use crate::convert::error::ConvertError;
use crate::convert::inspect::{Shape, StructureSummary};

/// How records are pulled out of a recognized input shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Rows already carry canonical column names.
    PassThroughRows,
    /// Full extraction over an id-to-record mapping.
    NestedRecords,
    /// Transpose a column-oriented mapping into rows.
    ColumnOriented,
}

/// Pure dispatch: no heuristic conversion of unrecognized shapes. An unknown
/// shape fails with the structure summary attached verbatim.
pub fn route(shape: Shape, summary: &StructureSummary) -> Result<Strategy, ConvertError> {
    match shape {
        Shape::Tabular => Ok(Strategy::PassThroughRows),
        Shape::RecordMap => Ok(Strategy::NestedRecords),
        Shape::ColumnMap => Ok(Strategy::ColumnOriented),
        Shape::Unknown => Err(ConvertError::UnsupportedFormat {
            summary: summary.clone(),
        }),
    }
}

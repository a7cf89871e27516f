//! Persist the canonical table as a Parquet file.
//!
//! The physical layout matches what the downstream reconstruction engine
//! reads: scalar columns plus `time`/`value` as `List<Float64>`.

use crate::convert::error::ConvertError;
use crate::convert::types::CanonicalTable;
use arrow::array::{ArrayRef, Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// The artifact schema: the only output contract this crate guarantees.
pub fn table_schema() -> Arc<Schema> {
    let float_item = || Arc::new(Field::new("item", DataType::Float64, true));
    Arc::new(Schema::new(vec![
        Field::new("pid", DataType::Utf8, false),
        Field::new("lat", DataType::Float64, true),
        Field::new("lon", DataType::Float64, true),
        Field::new("elev", DataType::Float64, false),
        Field::new("time", DataType::List(float_item()), false),
        Field::new("value", DataType::List(float_item()), false),
        Field::new("ptype", DataType::Utf8, false),
    ]))
}

/// Write the table to `path`, replacing any existing file.
pub fn write_table(table: &CanonicalTable, path: &Path) -> Result<(), ConvertError> {
    let batch = to_batch(table)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn to_batch(table: &CanonicalTable) -> Result<RecordBatch, ArrowError> {
    let records = table.records();

    let pid: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.pid.as_str()).collect::<Vec<_>>(),
    ));
    let lat: ArrayRef = Arc::new(Float64Array::from(
        records.iter().map(|r| r.lat).collect::<Vec<_>>(),
    ));
    let lon: ArrayRef = Arc::new(Float64Array::from(
        records.iter().map(|r| r.lon).collect::<Vec<_>>(),
    ));
    let elev: ArrayRef = Arc::new(Float64Array::from(
        records.iter().map(|r| r.elev).collect::<Vec<_>>(),
    ));
    let time: ArrayRef = Arc::new(list_column(records.iter().map(|r| r.time.as_slice())));
    let value: ArrayRef = Arc::new(list_column(records.iter().map(|r| r.value.as_slice())));
    let ptype: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.ptype.as_str()).collect::<Vec<_>>(),
    ));

    RecordBatch::try_new(
        table_schema(),
        vec![pid, lat, lon, elev, time, value, ptype],
    )
}

fn list_column<'a>(series: impl Iterator<Item = &'a [f64]>) -> arrow::array::ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for values in series {
        builder.values().append_slice(values);
        builder.append(true);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::assemble::assemble;
    use crate::convert::types::ProxyRecord;
    use arrow::array::Array;

    fn sample_table() -> CanonicalTable {
        assemble(vec![
            ProxyRecord {
                pid: "A".to_string(),
                lat: Some(32.3),
                lon: Some(295.5),
                elev: 0.0,
                ptype: "coral.d18o".to_string(),
                time: vec![2000.0, 1999.0],
                value: vec![-3.2, -3.1],
            },
            ProxyRecord {
                pid: "B".to_string(),
                lat: None,
                lon: None,
                elev: 120.0,
                ptype: "tree.trw".to_string(),
                time: vec![1990.0],
                value: vec![0.8],
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_batch_carries_all_columns() {
        let batch = to_batch(&sample_table()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 7);

        let names: Vec<&str> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(
            names,
            vec!["pid", "lat", "lon", "elev", "time", "value", "ptype"]
        );
    }

    #[test]
    fn test_absent_coordinates_are_null() {
        let batch = to_batch(&sample_table()).unwrap();
        let lat = batch
            .column_by_name("lat")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(!lat.is_null(0));
        assert!(lat.is_null(1));
    }
}

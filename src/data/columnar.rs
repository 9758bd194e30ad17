//! Conversion between [`Dataset`] and Arrow record batches.
//!
//! Used to read and write parquet files and to render tables with Arrow's
//! pretty printer.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;

use super::model::{Column, ColumnKind, Dataset, Record, Schema, Value};

fn arrow_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Text => DataType::Utf8,
        ColumnKind::Integer => DataType::Int64,
        ColumnKind::Float => DataType::Float64,
        ColumnKind::Bool => DataType::Boolean,
    }
}

fn column_kind(data_type: &DataType) -> Option<ColumnKind> {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Some(ColumnKind::Text),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => Some(ColumnKind::Integer),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => Some(ColumnKind::Float),
        DataType::Boolean => Some(ColumnKind::Bool),
        _ => None,
    }
}

/// Arrow schema matching a dataset schema. Every column is nullable.
pub fn to_arrow_schema(schema: &Schema) -> ArrowSchema {
    ArrowSchema::new(
        schema
            .columns()
            .iter()
            .map(|c| Field::new(&c.name, arrow_type(c.kind), true))
            .collect::<Vec<_>>(),
    )
}

/// Build a single record batch holding the whole dataset.
pub fn to_record_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let schema = Arc::new(to_arrow_schema(dataset.schema()));
    let arrays: Vec<ArrayRef> = dataset
        .schema()
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| column_array(dataset, idx, col.kind))
        .collect();
    RecordBatch::try_new(schema, arrays).context("building record batch")
}

fn column_array(dataset: &Dataset, idx: usize, kind: ColumnKind) -> ArrayRef {
    let cells = dataset.records().iter().map(|r| r.get(idx));
    match kind {
        ColumnKind::Text => Arc::new(StringArray::from(
            cells
                .map(|v| match v {
                    Value::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Integer => Arc::new(Int64Array::from(
            cells.map(Value::as_i64).collect::<Vec<_>>(),
        )),
        ColumnKind::Float => Arc::new(Float64Array::from(
            cells.map(Value::as_f64).collect::<Vec<_>>(),
        )),
        ColumnKind::Bool => Arc::new(BooleanArray::from(
            cells
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
    }
}

/// Convert record batches (all sharing one schema) into a dataset.
pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Dataset> {
    let Some(first) = batches.first() else {
        return Ok(Dataset::empty());
    };

    let arrow_schema = first.schema();
    let columns: Vec<Column> = arrow_schema
        .fields()
        .iter()
        .map(|f| match column_kind(f.data_type()) {
            Some(kind) => Ok(Column::new(f.name().clone(), kind)),
            None => bail!("column '{}' has unsupported type {:?}", f.name(), f.data_type()),
        })
        .collect::<Result<_>>()?;
    let schema = Schema::new(columns)?;

    let mut records = Vec::new();
    for batch in batches {
        // Normalise each column to the one physical type per kind.
        let normalised: Vec<ArrayRef> = batch
            .columns()
            .iter()
            .zip(schema.columns())
            .map(|(array, col)| {
                cast(array, &arrow_type(col.kind))
                    .with_context(|| format!("casting column '{}'", col.name))
            })
            .collect::<Result<_>>()?;

        for row in 0..batch.num_rows() {
            let values = normalised
                .iter()
                .zip(schema.columns())
                .map(|(array, col)| cell(array, row, col.kind))
                .collect();
            records.push(Record::new(values));
        }
    }

    Ok(Dataset::new(schema, records)?)
}

fn cell(array: &ArrayRef, row: usize, kind: ColumnKind) -> Value {
    if array.is_null(row) {
        return Value::Null;
    }
    match kind {
        ColumnKind::Text => Value::Text(array.as_string::<i32>().value(row).to_string()),
        ColumnKind::Integer => Value::Integer(array.as_primitive::<Int64Type>().value(row)),
        ColumnKind::Float => Value::Float(array.as_primitive::<Float64Type>().value(row)),
        ColumnKind::Bool => Value::Bool(array.as_boolean().value(row)),
    }
}

/// Render a dataset as an ASCII table.
pub fn pretty_table(dataset: &Dataset) -> Result<String> {
    let batch = to_record_batch(dataset)?;
    let table = arrow::util::pretty::pretty_format_batches(&[batch]).context("formatting table")?;
    Ok(table.to_string())
}

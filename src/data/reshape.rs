use super::model::{Column, ColumnKind, Dataset, Record, Schema, Value};
use crate::error::PipelineError;

/// Unpivot a wide table: every column not in `id_columns` becomes one row of
/// `(ids.., variable_name, value_name)`.
///
/// Rows are emitted variable by variable (all rows of the first value column,
/// then the second, ...). Value columns must all be numeric; the value column
/// is Float.
pub fn melt(
    dataset: &Dataset,
    id_columns: &[&str],
    variable_name: &str,
    value_name: &str,
) -> Result<Dataset, PipelineError> {
    let schema = dataset.schema();
    let id_idx: Vec<usize> = id_columns
        .iter()
        .map(|c| schema.require(c))
        .collect::<Result<_, _>>()?;

    let value_cols: Vec<(usize, &Column)> = schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| !id_idx.contains(i))
        .collect();

    if let Some((_, col)) = value_cols.iter().find(|(_, c)| !c.kind.is_numeric()) {
        return Err(PipelineError::InvalidConfig(format!(
            "cannot melt non-numeric column '{}'",
            col.name
        )));
    }

    let mut columns: Vec<Column> = id_idx
        .iter()
        .map(|&i| schema.columns()[i].clone())
        .collect();
    columns.push(Column::new(variable_name, ColumnKind::Text));
    columns.push(Column::new(value_name, ColumnKind::Float));
    let out_schema = Schema::new(columns)?;

    let mut records = Vec::with_capacity(dataset.len() * value_cols.len());
    for (idx, col) in &value_cols {
        for rec in dataset.records() {
            let mut values: Vec<Value> = id_idx.iter().map(|&i| rec.get(i).clone()).collect();
            values.push(Value::Text(col.name.clone()));
            values.push(rec.get(*idx).as_f64().map_or(Value::Null, Value::Float));
            records.push(Record::new(values));
        }
    }

    Dataset::new(out_schema, records)
}

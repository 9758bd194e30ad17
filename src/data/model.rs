use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Filters keep values in `BTreeSet`s, so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Null => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Value {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The column kind this value belongs to, `None` for null.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Text(_) => Some(ColumnKind::Text),
            Value::Integer(_) => Some(ColumnKind::Integer),
            Value::Float(_) => Some(ColumnKind::Float),
            Value::Bool(_) => Some(ColumnKind::Bool),
            Value::Null => None,
        }
    }

    /// Parse text as a value of the given kind; unparseable numbers are null.
    pub fn parse_as(text: &str, kind: ColumnKind) -> Value {
        match kind {
            ColumnKind::Integer => text.parse().map_or(Value::Null, Value::Integer),
            ColumnKind::Float => text.parse().map_or(Value::Null, Value::Float),
            ColumnKind::Bool => Value::Bool(text == "true"),
            ColumnKind::Text => Value::Text(text.to_string()),
        }
    }

    /// Equality that treats `Integer(3)` and `Float(3.0)` as the same number.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Bool,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Column {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered, fixed set of columns shared by every record of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting duplicate column names.
    pub fn new(columns: Vec<Column>) -> Result<Self, PipelineError> {
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of a column, or [`PipelineError::ColumnNotFound`].
    pub fn require(&self, name: &str) -> Result<usize, PipelineError> {
        self.index_of(name)
            .ok_or_else(|| PipelineError::ColumnNotFound(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// A new schema with extra columns appended.
    pub fn extended(&self, extra: Vec<Column>) -> Result<Self, PipelineError> {
        let mut columns = self.columns.clone();
        columns.extend(extra);
        Schema::new(columns)
    }
}

// ---------------------------------------------------------------------------
// Record – one row
// ---------------------------------------------------------------------------

/// One row; values are stored in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Record { values }
    }

    pub fn get(&self, idx: usize) -> &Value {
        self.values.get(idx).unwrap_or(&Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete table
// ---------------------------------------------------------------------------

/// A table of records with pre-computed per-column unique values.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
    /// For each column the sorted set of unique values.
    unique_values: BTreeMap<String, BTreeSet<Value>>,
}

impl Dataset {
    /// Build a dataset and its column indices.
    ///
    /// Every record must have one value per column, and each non-null value
    /// must match its column's kind.
    pub fn new(schema: Schema, records: Vec<Record>) -> Result<Self, PipelineError> {
        for (row, rec) in records.iter().enumerate() {
            if rec.values.len() != schema.len() {
                return Err(PipelineError::InvalidConfig(format!(
                    "row {row} has {} values but schema has {} columns",
                    rec.values.len(),
                    schema.len()
                )));
            }
            for (val, col) in rec.values.iter().zip(schema.columns()) {
                if let Some(kind) = val.kind() {
                    if kind != col.kind {
                        return Err(PipelineError::InvalidConfig(format!(
                            "row {row}: column '{}' expects {:?}, got {val:?}",
                            col.name, col.kind
                        )));
                    }
                }
            }
        }

        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = schema
            .names()
            .map(|n| (n.to_string(), BTreeSet::new()))
            .collect();
        for rec in &records {
            for (col, val) in schema.columns().iter().zip(&rec.values) {
                if let Some(set) = unique_values.get_mut(&col.name) {
                    set.insert(val.clone());
                }
            }
        }

        Ok(Dataset {
            schema,
            records,
            unique_values,
        })
    }

    /// A dataset with no columns and no rows (the result of a failed load).
    pub fn empty() -> Self {
        Dataset {
            schema: Schema::default(),
            records: Vec::new(),
            unique_values: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn unique_values(&self, column: &str) -> Option<&BTreeSet<Value>> {
        self.unique_values.get(column)
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Result<impl Iterator<Item = &Value>, PipelineError> {
        let idx = self.schema.require(column)?;
        Ok(self.records.iter().map(move |r| r.get(idx)))
    }

    /// Copy of the rows at `indices`, sharing this dataset's schema.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        let records: Vec<Record> = indices
            .iter()
            .filter_map(|&i| self.records.get(i).cloned())
            .collect();
        // Rows come from a valid dataset, so validation cannot fail.
        Dataset::new(self.schema.clone(), records).unwrap_or_else(|_| Dataset::empty())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Dataset {
        let schema = Schema::new(vec![
            Column::new("name", ColumnKind::Text),
            Column::new("n", ColumnKind::Integer),
        ])
        .unwrap();
        Dataset::new(
            schema,
            vec![
                Record::new(vec!["a".into(), 1.into()]),
                Record::new(vec!["b".into(), Value::Null]),
                Record::new(vec!["a".into(), 3.into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn unique_values_are_sorted_and_deduplicated() {
        let ds = small();
        let names: Vec<_> = ds.unique_values("name").unwrap().iter().cloned().collect();
        assert_eq!(names, vec![Value::from("a"), Value::from("b")]);
        assert!(ds.unique_values("n").unwrap().contains(&Value::Null));
    }

    #[test]
    fn rejects_kind_mismatch() {
        let schema = Schema::new(vec![Column::new("n", ColumnKind::Integer)]).unwrap();
        let err = Dataset::new(schema, vec![Record::new(vec![Value::Float(1.5)])]);
        assert!(matches!(err, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = Schema::new(vec![
            Column::new("x", ColumnKind::Float),
            Column::new("x", ColumnKind::Float),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn null_sorts_first_and_floats_use_total_order() {
        let mut vals = vec![Value::Float(2.0), Value::Null, Value::Float(-1.0)];
        vals.sort();
        assert_eq!(vals, vec![Value::Null, Value::Float(-1.0), Value::Float(2.0)]);
    }

    #[test]
    fn loose_equality_crosses_integer_and_float() {
        assert!(Value::Integer(17).loosely_equals(&Value::Float(17.0)));
        assert!(!Value::Integer(17).loosely_equals(&Value::from("17")));
    }

    #[test]
    fn select_rows_keeps_schema() {
        let ds = small();
        let sub = ds.select_rows(&[2]);
        assert_eq!(sub.schema(), ds.schema());
        assert_eq!(sub.records()[0], ds.records()[2]);
    }
}

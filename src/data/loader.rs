use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDateTime, Timelike};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::columnar::from_record_batches;
use super::model::{Column, ColumnKind, Dataset, Record, Schema, Value};
use super::remote;
use super::synthetic::{self, SyntheticKind};
use crate::config::PipelineConfig;
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Source descriptors
// ---------------------------------------------------------------------------

/// Where a dataset comes from. Also the session cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Seeded generator; the same seed always yields the same dataset.
    Synthetic { kind: SyntheticKind, seed: u64 },
    /// Delimited text over HTTP(S), truncated to `row_limit` rows.
    Remote { url: String, row_limit: usize },
    /// Local `.csv`, `.json` or `.parquet` file.
    File { path: PathBuf },
}

impl Source {
    /// Short label used in log lines and error messages.
    pub fn label(&self) -> String {
        match self {
            Source::Synthetic { kind, seed } => format!("synthetic {kind:?} (seed {seed})"),
            Source::Remote { url, .. } => url.clone(),
            Source::File { path } => path.display().to_string(),
        }
    }
}

/// Result of a load: the dataset (empty on failure) and the failure, if any.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub dataset: Arc<Dataset>,
    pub error: Option<LoadError>,
}

impl LoadedDataset {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a source, degrading any failure to an empty dataset plus a reported
/// [`LoadError`].
pub fn load(source: &Source, config: &PipelineConfig) -> LoadedDataset {
    match load_source(source, config) {
        Ok(dataset) => {
            log::info!(
                "Loaded {} rows with columns {:?} from {}",
                dataset.len(),
                dataset.schema().names().collect::<Vec<_>>(),
                source.label()
            );
            LoadedDataset {
                dataset: Arc::new(dataset),
                error: None,
            }
        }
        Err(e) => {
            log::error!("Failed to load {}: {e}", source.label());
            LoadedDataset {
                dataset: Arc::new(Dataset::empty()),
                error: Some(e),
            }
        }
    }
}

/// Load a source, returning the failure as an error.
pub fn load_source(source: &Source, config: &PipelineConfig) -> Result<Dataset, LoadError> {
    match source {
        Source::Synthetic { kind, seed } => {
            synthetic::generate(*kind, *seed).map_err(|e| LoadError::Parse {
                source_name: source.label(),
                reason: e.to_string(),
            })
        }
        Source::Remote { url, row_limit } => {
            let response = remote::fetch(url)?;
            let options = DelimitedOptions {
                row_limit: Some(*row_limit),
                lowercase_headers: true,
                timestamp_column: Some(config.timestamp_column.clone()),
            };
            // The CSV reader stops after `row_limit` records; the rest of the
            // body is never downloaded.
            parse_delimited(response, &options).map_err(|e| {
                if is_read_failure(&e) {
                    LoadError::Fetch {
                        url: url.clone(),
                        reason: format!("{e:#}"),
                    }
                } else {
                    LoadError::Parse {
                        source_name: url.clone(),
                        reason: format!("{e:#}"),
                    }
                }
            })
        }
        Source::File { path } => load_file(path, config).map_err(|e| match e.downcast() {
            Ok(classified) => classified,
            Err(e) => LoadError::Parse {
                source_name: path.display().to_string(),
                reason: format!("{e:#}"),
            },
        }),
    }
}

/// True when a delimited parse failed because the underlying stream broke.
fn is_read_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<csv::Error>()
            .is_some_and(|e| matches!(e.kind(), csv::ErrorKind::Io(_)))
            || cause.is::<std::io::Error>()
    })
}

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat columns of strings, integers, floats or booleans
/// * `.json`    – `[{ "column": value, ... }, ...]`
/// * `.csv`     – header row followed by data rows
pub fn load_file(path: &Path, config: &PipelineConfig) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            let options = DelimitedOptions {
                row_limit: None,
                lowercase_headers: false,
                timestamp_column: Some(config.timestamp_column.clone()),
            };
            parse_delimited(file, &options)
        }
        other => Err(LoadError::Unsupported(format!("file extension .{other}")).into()),
    }
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// How to read a delimited text table.
#[derive(Debug, Clone, Default)]
pub struct DelimitedOptions {
    /// Stop after this many data rows.
    pub row_limit: Option<usize>,
    /// Lowercase every header name.
    pub lowercase_headers: bool,
    /// If a column with this name exists, derive an integer `hour` column.
    pub timestamp_column: Option<String>,
}

/// Parse CSV bytes into a dataset, inferring one kind per column.
pub fn parse_delimited<R: Read>(reader: R, options: &DelimitedOptions) -> Result<Dataset> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| {
            let h = h.trim();
            if options.lowercase_headers {
                h.to_lowercase()
            } else {
                h.to_string()
            }
        })
        .collect();

    let limit = options.row_limit.unwrap_or(usize::MAX);
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for (row_no, result) in reader.records().take(limit).enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                headers.len(),
                record.len()
            );
        }
        rows.push(
            record
                .iter()
                .map(|cell| {
                    let cell = cell.trim();
                    (!cell.is_empty()).then(|| cell.to_string())
                })
                .collect(),
        );
    }

    if let Some(ts_col) = &options.timestamp_column {
        derive_hour(&mut headers, &mut rows, ts_col);
    }

    infer_dataset(headers, rows)
}

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_hour(s: &str) -> Option<u32> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ts| ts.hour())
}

/// Append an `hour` column computed from the timestamp column, if present.
fn derive_hour(headers: &mut Vec<String>, rows: &mut [Vec<Option<String>>], ts_col: &str) {
    let Some(ts_idx) = headers.iter().position(|h| h == ts_col) else {
        return;
    };
    if headers.iter().any(|h| h == "hour") {
        return;
    }
    headers.push("hour".to_string());
    for row in rows.iter_mut() {
        let hour = row[ts_idx]
            .as_deref()
            .and_then(parse_hour)
            .map(|h| h.to_string());
        row.push(hour);
    }
}

// ---------------------------------------------------------------------------
// Column kind inference
// ---------------------------------------------------------------------------

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> ColumnKind {
    let mut cells = cells.peekable();
    if cells.peek().is_none() {
        return ColumnKind::Text;
    }
    if cells.clone().all(|s| s.parse::<i64>().is_ok()) {
        ColumnKind::Integer
    } else if cells.clone().all(|s| s.parse::<f64>().is_ok()) {
        ColumnKind::Float
    } else if cells.all(|s| s == "true" || s == "false") {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

/// Build a dataset from raw text cells; `None` cells become null.
fn infer_dataset(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Dataset> {
    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|c| infer_kind(rows.iter().filter_map(move |r| r[c].as_deref())))
        .collect();

    let schema = Schema::new(
        headers
            .into_iter()
            .zip(&kinds)
            .map(|(name, kind)| Column::new(name, *kind))
            .collect(),
    )?;

    let records = rows
        .into_iter()
        .map(|row| {
            Record::new(
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| cell.as_deref().map_or(Value::Null, |s| Value::parse_as(s, *kind)))
                    .collect(),
            )
        })
        .collect();

    Ok(Dataset::new(schema, records)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "category": "Food & Beverage", "amount": 420000.0 },
///   ...
/// ]
/// ```
///
/// Columns are the union of all keys; missing keys are null.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            headers
                .iter()
                .map(|h| json_cell(obj.get(h), i, h))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    infer_dataset(headers, rows)
}

fn json_cell(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Option<String>> {
    match val {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok((!s.is_empty()).then(|| s.clone())),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => bail!("Row {row}, '{col}': nested values are not supported"),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file (as written by Pandas `df.to_parquet()` or
/// Polars `df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("reading parquet record batch")?;
    from_record_batches(&batches)
}

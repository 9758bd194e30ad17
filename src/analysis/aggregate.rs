use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{ColumnKind, Dataset, Value};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Group mean
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub key: Value,
    pub mean: f64,
    /// Number of non-null values that went into the mean.
    pub count: usize,
}

fn require_numeric(dataset: &Dataset, column: &str) -> Result<usize, PipelineError> {
    let idx = dataset.schema().require(column)?;
    if dataset.schema().columns()[idx].kind.is_numeric() {
        Ok(idx)
    } else {
        Err(PipelineError::NonNumeric(column.to_string()))
    }
}

/// Mean of `value_column` per distinct value of `group_column`, highest mean
/// first. Ties are ordered by key; groups without any numeric value are
/// left out.
pub fn group_mean(
    dataset: &Dataset,
    group_column: &str,
    value_column: &str,
) -> Result<Vec<GroupMean>, PipelineError> {
    let group_idx = dataset.schema().require(group_column)?;
    let value_idx = require_numeric(dataset, value_column)?;

    let mut sums: BTreeMap<&Value, (f64, usize)> = BTreeMap::new();
    for rec in dataset.records() {
        if let Some(v) = rec.get(value_idx).as_f64().filter(|v| !v.is_nan()) {
            let entry = sums.entry(rec.get(group_idx)).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }

    let mut groups: Vec<GroupMean> = sums
        .into_iter()
        .map(|(key, (sum, count))| GroupMean {
            key: key.clone(),
            mean: sum / count as f64,
            count,
        })
        .collect();
    groups.sort_by(|a, b| b.mean.total_cmp(&a.mean).then_with(|| a.key.cmp(&b.key)));
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Fixed-width histogram
// ---------------------------------------------------------------------------

/// Unit-width bucket counts over `[0, counts.len())`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Bucket with the most values (lowest bucket on ties).
    pub fn peak(&self) -> Option<usize> {
        self.counts
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then_with(|| ib.cmp(ia)))
            .map(|(i, _)| i)
    }
}

/// Count values of an integer column per bucket `0..buckets`.
/// Zero-count buckets are kept; values outside the range are ignored.
pub fn histogram(
    dataset: &Dataset,
    column: &str,
    buckets: usize,
) -> Result<Histogram, PipelineError> {
    let idx = dataset.schema().require(column)?;
    if dataset.schema().columns()[idx].kind != ColumnKind::Integer {
        return Err(PipelineError::NonNumeric(column.to_string()));
    }

    let mut counts = vec![0u64; buckets];
    for rec in dataset.records() {
        if let Some(v) = rec.get(idx).as_i64() {
            if let Ok(bucket) = usize::try_from(v) {
                if let Some(slot) = counts.get_mut(bucket) {
                    *slot += 1;
                }
            }
        }
    }

    Ok(Histogram {
        column: column.to_string(),
        counts,
    })
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub mean: f64,
    /// Sample standard deviation; absent with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    /// Non-null values.
    pub count: usize,
    /// Absent when the column has no values.
    pub stats: Option<SummaryStats>,
}

/// Quantile of sorted data with linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn summarize(mut values: Vec<f64>) -> Option<SummaryStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.len() > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    });

    Some(SummaryStats {
        mean,
        std,
        min: values[0],
        q1: quantile(&values, 0.25)?,
        median: quantile(&values, 0.5)?,
        q3: quantile(&values, 0.75)?,
        max: values[values.len() - 1],
    })
}

fn summarize_column(dataset: &Dataset, idx: usize) -> ColumnSummary {
    let values: Vec<f64> = dataset
        .records()
        .iter()
        .filter_map(|r| r.get(idx).as_f64())
        .filter(|v| !v.is_nan())
        .collect();
    ColumnSummary {
        column: dataset.schema().columns()[idx].name.clone(),
        count: values.len(),
        stats: summarize(values),
    }
}

/// One summary per numeric column, in schema order.
pub fn describe(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset
        .schema()
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind.is_numeric())
        .map(|(idx, _)| summarize_column(dataset, idx))
        .collect()
}

/// Summaries for the named columns only, in the given order.
pub fn describe_columns(
    dataset: &Dataset,
    columns: &[&str],
) -> Result<Vec<ColumnSummary>, PipelineError> {
    columns
        .iter()
        .map(|name| {
            let idx = require_numeric(dataset, name)?;
            Ok(summarize_column(dataset, idx))
        })
        .collect()
}

//! Plain-text rendering of pipeline results for the command line.
//!
//! Each aggregate is turned into a small [`Dataset`] and printed with
//! Arrow's table formatter.

use anyhow::Result;

use crate::analysis::aggregate::{ColumnSummary, GroupMean, Histogram};
use crate::analysis::cluster::ClusterAssignment;
use crate::data::columnar::pretty_table;
use crate::data::model::{Column, ColumnKind, Dataset, Record, Schema, Value};
use crate::pipeline::{PipelineOutput, Report};

pub const NO_DATA_MESSAGE: &str = "No data for the current filters.";

fn float_or_null(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Float)
}

pub fn group_means_table(group_column: &str, groups: &[GroupMean]) -> Result<Dataset> {
    let schema = Schema::new(vec![
        Column::new(group_column, ColumnKind::Text),
        Column::new("mean", ColumnKind::Float),
        Column::new("count", ColumnKind::Integer),
    ])?;
    let records = groups
        .iter()
        .map(|g| {
            Record::new(vec![
                Value::Text(g.key.to_string()),
                Value::Float(g.mean),
                Value::Integer(g.count as i64),
            ])
        })
        .collect();
    Ok(Dataset::new(schema, records)?)
}

pub fn histogram_table(histogram: &Histogram) -> Result<Dataset> {
    let schema = Schema::new(vec![
        Column::new(histogram.column.as_str(), ColumnKind::Integer),
        Column::new("count", ColumnKind::Integer),
    ])?;
    let records = histogram
        .counts
        .iter()
        .enumerate()
        .map(|(bucket, &n)| Record::new(vec![Value::Integer(bucket as i64), Value::Integer(n as i64)]))
        .collect();
    Ok(Dataset::new(schema, records)?)
}

/// One row per column, like a transposed `describe()`.
pub fn summary_table(summaries: &[ColumnSummary]) -> Result<Dataset> {
    let mut columns = vec![
        Column::new("column", ColumnKind::Text),
        Column::new("count", ColumnKind::Integer),
    ];
    columns.extend(
        ["mean", "std", "min", "25%", "50%", "75%", "max"]
            .iter()
            .map(|n| Column::new(*n, ColumnKind::Float)),
    );
    let schema = Schema::new(columns)?;

    let records = summaries
        .iter()
        .map(|s| {
            let mut values = vec![Value::Text(s.column.clone()), Value::Integer(s.count as i64)];
            match &s.stats {
                Some(st) => values.extend([
                    Value::Float(st.mean),
                    float_or_null(st.std),
                    Value::Float(st.min),
                    Value::Float(st.q1),
                    Value::Float(st.median),
                    Value::Float(st.q3),
                    Value::Float(st.max),
                ]),
                None => values.extend(std::iter::repeat(Value::Null).take(7)),
            }
            Record::new(values)
        })
        .collect();
    Ok(Dataset::new(schema, records)?)
}

pub fn clusters_table(assignment: &ClusterAssignment) -> Result<Dataset> {
    let schema = Schema::new(vec![
        Column::new("cluster", ColumnKind::Integer),
        Column::new("color", ColumnKind::Text),
        Column::new("size", ColumnKind::Integer),
        Column::new("centroid_x", ColumnKind::Float),
        Column::new("centroid_y", ColumnKind::Float),
    ])?;
    let sizes = assignment.sizes();
    let records = assignment
        .centroids
        .iter()
        .enumerate()
        .map(|(label, c)| {
            let color = assignment
                .labels
                .iter()
                .position(|&l| l == label)
                .map_or(Value::Null, |i| Value::Text(assignment.colors[i].clone()));
            Record::new(vec![
                Value::Integer(label as i64),
                color,
                Value::Integer(sizes[label] as i64),
                Value::Float(c[0]),
                Value::Float(c[1]),
            ])
        })
        .collect();
    Ok(Dataset::new(schema, records)?)
}

/// Render a whole report, section by section. `max_rows` caps the row
/// listing; aggregates are always printed in full.
pub fn render_report(report: &Report, group_column: Option<&str>, max_rows: usize) -> Result<String> {
    let mut out = String::new();

    let shown: Vec<usize> = (0..report.rows.len().min(max_rows)).collect();
    out.push_str(&format!(
        "Rows ({} matching, showing {}):\n",
        report.row_count,
        shown.len()
    ));
    out.push_str(&pretty_table(&report.rows.select_rows(&shown))?);
    out.push('\n');

    if let Some(groups) = &report.group_means {
        out.push_str("\nGroup means:\n");
        out.push_str(&pretty_table(&group_means_table(group_column.unwrap_or("group"), groups)?)?);
        out.push('\n');
    }
    if let Some(histogram) = &report.histogram {
        out.push_str(&format!("\nHistogram of {}:\n", histogram.column));
        out.push_str(&pretty_table(&histogram_table(histogram)?)?);
        out.push('\n');
    }
    if let Some(summary) = &report.summary {
        out.push_str("\nSummary statistics:\n");
        out.push_str(&pretty_table(&summary_table(summary)?)?);
        out.push('\n');
    }
    if let Some(clusters) = &report.clusters {
        out.push_str(&format!(
            "\nClusters (k={}, {} rounds, converged: {}):\n",
            clusters.k, clusters.iterations, clusters.converged
        ));
        out.push_str(&pretty_table(&clusters_table(clusters)?)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn render_output(output: &PipelineOutput, group_column: Option<&str>, max_rows: usize) -> Result<String> {
    match output {
        PipelineOutput::NoData => Ok(format!("{NO_DATA_MESSAGE}\n")),
        PipelineOutput::Ready(report) => render_report(report, group_column, max_rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate::SummaryStats;

    #[test]
    fn histogram_table_has_one_row_per_bucket() {
        let h = Histogram {
            column: "hour".into(),
            counts: vec![0, 2, 1],
        };
        let t = histogram_table(&h).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.records()[1].get(1), &Value::Integer(2));
    }

    #[test]
    fn summary_without_values_renders_nulls() {
        let t = summary_table(&[
            ColumnSummary {
                column: "x".into(),
                count: 0,
                stats: None,
            },
            ColumnSummary {
                column: "y".into(),
                count: 1,
                stats: Some(SummaryStats {
                    mean: 1.0,
                    std: None,
                    min: 1.0,
                    q1: 1.0,
                    median: 1.0,
                    q3: 1.0,
                    max: 1.0,
                }),
            },
        ])
        .unwrap();
        assert_eq!(t.records()[0].get(2), &Value::Null);
        assert_eq!(t.records()[1].get(3), &Value::Null);
        assert_eq!(t.records()[1].get(2), &Value::Float(1.0));
    }

    #[test]
    fn no_data_renders_placeholder() {
        let text = render_output(&PipelineOutput::NoData, None, 10).unwrap();
        assert_eq!(text.trim(), NO_DATA_MESSAGE);
    }
}

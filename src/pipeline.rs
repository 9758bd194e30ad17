//! One interaction: filter → cluster → aggregate.

use serde::Serialize;

use crate::analysis::aggregate::{self, ColumnSummary, GroupMean, Histogram};
use crate::analysis::cluster::{self, ClusterAssignment, ClusterOutcome, KMeansOptions};
use crate::color::Palette;
use crate::config::PipelineConfig;
use crate::data::filter::{self, FilterCriteria, FilterOutcome};
use crate::data::model::Dataset;
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMeanRequest {
    pub group_column: String,
    pub value_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramRequest {
    pub column: String,
    pub buckets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRequest {
    pub x_column: String,
    pub y_column: String,
    pub k: usize,
}

/// Everything the front end asks for in one interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineRequest {
    pub criteria: FilterCriteria,
    pub group_mean: Option<GroupMeanRequest>,
    pub histogram: Option<HistogramRequest>,
    pub describe: bool,
    pub clustering: Option<ClusterRequest>,
}

impl PipelineRequest {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            ..Default::default()
        }
    }

    pub fn group_mean(mut self, group_column: &str, value_column: &str) -> Self {
        self.group_mean = Some(GroupMeanRequest {
            group_column: group_column.to_string(),
            value_column: value_column.to_string(),
        });
        self
    }

    pub fn histogram(mut self, column: &str, buckets: usize) -> Self {
        self.histogram = Some(HistogramRequest {
            column: column.to_string(),
            buckets,
        });
        self
    }

    pub fn describe(mut self) -> Self {
        self.describe = true;
        self
    }

    pub fn cluster(mut self, x_column: &str, y_column: &str, k: usize) -> Self {
        self.clustering = Some(ClusterRequest {
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            k,
        });
        self
    }
}

/// Output of a run over a non-empty filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Filtered rows, with cluster columns when clustering ran with k ≥ 2.
    #[serde(skip)]
    pub rows: Dataset,
    pub row_count: usize,
    pub group_means: Option<Vec<GroupMean>>,
    pub histogram: Option<Histogram>,
    pub summary: Option<Vec<ColumnSummary>>,
    pub clusters: Option<ClusterAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "report", rename_all = "snake_case")]
pub enum PipelineOutput {
    /// Valid criteria matched nothing; show a placeholder.
    NoData,
    Ready(Report),
}

impl PipelineOutput {
    pub fn report(&self) -> Option<&Report> {
        match self {
            PipelineOutput::Ready(report) => Some(report),
            PipelineOutput::NoData => None,
        }
    }
}

/// Runs requests against a dataset with fixed clustering settings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    kmeans: KMeansOptions,
    palette: Palette,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl Pipeline {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            kmeans: KMeansOptions {
                seed: config.seed,
                max_iterations: config.kmeans_max_iterations,
                max_clusters: config.max_clusters,
            },
            palette: Palette::with_size(config.palette_size),
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Filter the dataset, then cluster and aggregate the matching rows.
    /// Aggregates are computed over the filtered rows, before cluster
    /// columns are appended.
    pub fn run(
        &self,
        dataset: &Dataset,
        request: &PipelineRequest,
    ) -> Result<PipelineOutput, PipelineError> {
        let subset = match filter::filter(dataset, &request.criteria)? {
            FilterOutcome::Rows(rows) => rows,
            FilterOutcome::NoData => {
                log::debug!("no rows match the current filters");
                return Ok(PipelineOutput::NoData);
            }
        };

        let group_means = request
            .group_mean
            .as_ref()
            .map(|g| aggregate::group_mean(&subset, &g.group_column, &g.value_column))
            .transpose()?;
        let histogram = request
            .histogram
            .as_ref()
            .map(|h| aggregate::histogram(&subset, &h.column, h.buckets))
            .transpose()?;
        let summary = request.describe.then(|| aggregate::describe(&subset));

        let (rows, clusters) = match &request.clustering {
            Some(c) => match cluster::cluster(
                &subset,
                &c.x_column,
                &c.y_column,
                c.k,
                &self.kmeans,
                &self.palette,
            )? {
                ClusterOutcome::Unclustered(rows) => (rows, None),
                ClusterOutcome::Clustered { rows, assignment } => (rows, Some(assignment)),
            },
            None => (subset, None),
        };

        Ok(PipelineOutput::Ready(Report {
            row_count: rows.len(),
            rows,
            group_means,
            histogram,
            summary,
            clusters,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Criterion;
    use crate::data::synthetic::{generate, SyntheticKind};

    #[test]
    fn pickups_by_hour_with_clusters() {
        let ds = generate(SyntheticKind::RidePickups { rows: 400 }, 42).unwrap();
        let request = PipelineRequest::new(FilterCriteria::from([(
            "hour".to_string(),
            Criterion::equals(18),
        )]))
        .cluster("lat", "lon", 4)
        .describe();

        let out = Pipeline::default().run(&ds, &request).unwrap();
        let report = out.report().expect("hour 18 is a busy hour");
        let clusters = report.clusters.as_ref().unwrap();
        assert_eq!(clusters.labels.len(), report.row_count);
        assert!(clusters.labels.iter().all(|&l| l < 4));
        assert!(report.rows.schema().index_of("cluster_color").is_some());
        // lat, lon, hour
        assert_eq!(report.summary.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn single_cluster_tolerates_missing_coordinates() {
        use crate::data::model::{Column, ColumnKind, Record, Schema, Value};

        let schema = Schema::new(vec![
            Column::new("hour", ColumnKind::Integer),
            Column::new("lat", ColumnKind::Float),
            Column::new("lon", ColumnKind::Float),
        ])
        .unwrap();
        let ds = Dataset::new(
            schema,
            vec![
                Record::new(vec![17.into(), 40.7.into(), (-73.9).into()]),
                Record::new(vec![17.into(), Value::Null, (-73.8).into()]),
            ],
        )
        .unwrap();
        let request = PipelineRequest::new(FilterCriteria::from([(
            "hour".to_string(),
            Criterion::equals(17),
        )]))
        .cluster("lat", "lon", 1);

        let out = Pipeline::default().run(&ds, &request).unwrap();
        let report = out.report().unwrap();
        assert_eq!(report.row_count, 2);
        assert!(report.clusters.is_none());
    }

    #[test]
    fn cluster_count_is_capped_by_config() {
        let ds = generate(SyntheticKind::RidePickups { rows: 50 }, 3).unwrap();
        let pipeline = Pipeline::from_config(&PipelineConfig {
            max_clusters: 4,
            ..Default::default()
        });
        let err = pipeline
            .run(&ds, &PipelineRequest::default().cluster("lat", "lon", 5))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn histogram_over_all_rows() {
        let ds = generate(SyntheticKind::RidePickups { rows: 250 }, 1).unwrap();
        let request = PipelineRequest::default().histogram("hour", 24);
        let out = Pipeline::default().run(&ds, &request).unwrap();
        assert_eq!(out.report().unwrap().histogram.as_ref().unwrap().total(), 250);
    }

    #[test]
    fn empty_match_short_circuits() {
        let ds = generate(SyntheticKind::GenerationSpending { rows: 50 }, 1).unwrap();
        let request = PipelineRequest::new(FilterCriteria::from([(
            "generation".to_string(),
            Criterion::equals("Gen Alpha"),
        )]))
        .group_mean("category", "amount");
        assert_eq!(Pipeline::default().run(&ds, &request).unwrap(), PipelineOutput::NoData);
    }

    #[test]
    fn malformed_request_is_an_error() {
        let ds = generate(SyntheticKind::GenerationSpending { rows: 50 }, 1).unwrap();
        let request = PipelineRequest::default().group_mean("category", "channel");
        let err = Pipeline::default().run(&ds, &request).unwrap_err();
        assert_eq!(err, PipelineError::NonNumeric("channel".into()));
    }
}

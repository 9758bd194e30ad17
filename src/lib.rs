//! Filter, aggregate and cluster small tabular datasets for dashboard front
//! ends.
//!
//! A [`Session`] owns the configuration and caches each loaded [`Dataset`];
//! a [`PipelineRequest`] describes one interaction (filter criteria plus the
//! aggregates and clustering to compute) and yields either
//! [`PipelineOutput::NoData`] or a [`Report`].

pub mod analysis;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod state;

pub use analysis::aggregate::{
    describe, describe_columns, group_mean, histogram, ColumnSummary, GroupMean, Histogram,
};
pub use analysis::cluster::{cluster, kmeans, ClusterAssignment, ClusterOutcome, KMeansOptions};
pub use color::Palette;
pub use config::PipelineConfig;
pub use data::filter::{filter, filtered_indices, init_criteria, Criterion, FilterCriteria, FilterOutcome};
pub use data::loader::{load, LoadedDataset, Source};
pub use data::model::{Column, ColumnKind, Dataset, Record, Schema, Value};
pub use data::reshape::melt;
pub use data::synthetic::SyntheticKind;
pub use error::{LoadError, PipelineError};
pub use pipeline::{Pipeline, PipelineOutput, PipelineRequest, Report};
pub use state::{Interaction, Session};

//! Pipeline configuration.
//!
//! All fields have defaults, so a config file only needs the keys it
//! overrides:
//!
//! ```json
//! { "seed": 7, "kmeans_max_iterations": 100 }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for synthetic generators and k-means initialization.
    /// Default: 42
    pub seed: u64,

    /// Upper bound on k-means assign/update rounds.
    /// Default: 300
    pub kmeans_max_iterations: usize,

    /// Largest cluster count a request may ask for.
    /// Default: 256
    pub max_clusters: usize,

    /// Number of entries in the cyclic cluster palette.
    /// Default: 10
    pub palette_size: usize,

    /// Maximum number of rows read from a remote source.
    /// Default: 100_000
    pub remote_row_limit: usize,

    /// Column (after lowercasing) an `hour` column is derived from.
    /// Default: "date/time"
    pub timestamp_column: String,

    /// Bucket count for hour-of-day histograms.
    /// Default: 24
    pub histogram_buckets: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            kmeans_max_iterations: 300,
            max_clusters: 256,
            palette_size: 10,
            remote_row_limit: 100_000,
            timestamp_column: "date/time".to_string(),
            histogram_buckets: 24,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file; missing keys fall back to defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.kmeans_max_iterations == 0 {
            return Err(PipelineError::InvalidConfig(
                "kmeans_max_iterations must be at least 1".into(),
            ));
        }
        if self.max_clusters == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_clusters must be at least 1".into(),
            ));
        }
        if self.palette_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "palette_size must be at least 1".into(),
            ));
        }
        if self.histogram_buckets == 0 {
            return Err(PipelineError::InvalidConfig(
                "histogram_buckets must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "seed": 7 }}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.kmeans_max_iterations, 300);
        assert_eq!(config.timestamp_column, "date/time");
        assert_eq!(config.max_clusters, 256);
    }

    #[test]
    fn zero_palette_is_rejected() {
        let config = PipelineConfig {
            palette_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

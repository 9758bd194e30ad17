//! Pure computations over a (filtered) dataset: group means, histograms,
//! descriptive statistics and k-means clustering.

pub mod aggregate;
pub mod cluster;

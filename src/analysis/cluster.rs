//! Seeded k-means over two coordinate columns.
//!
//! Initialization is k-means++ driven by a `StdRng` seeded from the options,
//! so identical input and seed always give identical labels. Iteration stops
//! when no label changes or after `max_iterations` assignment rounds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::color::Palette;
use crate::data::model::{Column, ColumnKind, Dataset, Record, Value};
use crate::error::PipelineError;

pub const CLUSTER_COLUMN: &str = "cluster";
pub const COLOR_COLUMN: &str = "cluster_color";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansOptions {
    pub seed: u64,
    pub max_iterations: usize,
    /// Largest accepted k.
    pub max_clusters: usize,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 300,
            max_clusters: 256,
        }
    }
}

/// k must lie in `[1, max_clusters]`.
fn check_k(k: usize, options: &KMeansOptions) -> Result<(), PipelineError> {
    if k == 0 {
        return Err(PipelineError::InvalidConfig(
            "cluster count must be at least 1".into(),
        ));
    }
    if k > options.max_clusters {
        return Err(PipelineError::InvalidConfig(format!(
            "cluster count {k} exceeds the limit of {}",
            options.max_clusters
        )));
    }
    Ok(())
}

/// Raw k-means result over a point set.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// One label per point, each in `[0, k)`.
    pub labels: Vec<usize>,
    pub centroids: Vec<[f64; 2]>,
    pub iterations: usize,
    pub converged: bool,
}

/// Labels and display colours attached to a filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    pub k: usize,
    pub labels: Vec<usize>,
    pub colors: Vec<String>,
    pub centroids: Vec<[f64; 2]>,
    pub iterations: usize,
    pub converged: bool,
}

impl ClusterAssignment {
    /// Members per label, including empty clusters.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterOutcome {
    /// k = 1: rows untouched, no cluster columns.
    Unclustered(Dataset),
    /// k ≥ 2: rows with `cluster` and `cluster_color` appended.
    Clustered {
        rows: Dataset,
        assignment: ClusterAssignment,
    },
}

impl ClusterOutcome {
    pub fn rows(&self) -> &Dataset {
        match self {
            ClusterOutcome::Unclustered(rows) => rows,
            ClusterOutcome::Clustered { rows, .. } => rows,
        }
    }

    pub fn assignment(&self) -> Option<&ClusterAssignment> {
        match self {
            ClusterOutcome::Unclustered(_) => None,
            ClusterOutcome::Clustered { assignment, .. } => Some(assignment),
        }
    }
}

// ---------------------------------------------------------------------------
// Core algorithm
// ---------------------------------------------------------------------------

fn dist2(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Index of the closest centroid; ties go to the lowest index.
fn nearest(point: &[f64; 2], centroids: &[[f64; 2]]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = dist2(point, c);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// k-means++ seeding: each further centroid is drawn with probability
/// proportional to its squared distance from the closest centroid so far.
fn init_centroids(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)]);

    let mut d2: Vec<f64> = points.iter().map(|p| dist2(p, &centroids[0])).collect();
    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in d2.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point already coincides with a centroid.
            rng.gen_range(0..n)
        };
        let c = points[pick];
        centroids.push(c);
        for (slot, p) in d2.iter_mut().zip(points) {
            *slot = slot.min(dist2(p, &c));
        }
    }
    centroids
}

/// Partition `points` into `k` clusters, `1 <= k <= options.max_clusters`.
///
/// Empty clusters are allowed: a centroid that loses all its members keeps
/// its previous position.
pub fn kmeans(
    points: &[[f64; 2]],
    k: usize,
    options: &KMeansOptions,
) -> Result<KMeansFit, PipelineError> {
    check_k(k, options)?;
    if points.is_empty() {
        return Ok(KMeansFit {
            labels: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
            converged: true,
        });
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut centroids = init_centroids(points, k, &mut rng);
    let mut labels = vec![0usize; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    for round in 0..options.max_iterations.max(1) {
        iterations = round + 1;

        let mut changed = round == 0;
        for (label, p) in labels.iter_mut().zip(points) {
            let l = nearest(p, &centroids);
            if l != *label {
                changed = true;
                *label = l;
            }
        }
        if !changed {
            converged = true;
            break;
        }

        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (&l, p) in labels.iter().zip(points) {
            sums[l][0] += p[0];
            sums[l][1] += p[1];
            counts[l] += 1;
        }
        for ((c, s), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if count > 0 {
                *c = [s[0] / count as f64, s[1] / count as f64];
            }
        }
    }

    log::debug!(
        "k-means k={k} n={} finished after {iterations} rounds (converged: {converged})",
        points.len()
    );
    Ok(KMeansFit {
        labels,
        centroids,
        iterations,
        converged,
    })
}

// ---------------------------------------------------------------------------
// Dataset adapter
// ---------------------------------------------------------------------------

/// Read `(x, y)` pairs from two numeric columns. Nulls are rejected.
pub fn coordinates(dataset: &Dataset, x: &str, y: &str) -> Result<Vec<[f64; 2]>, PipelineError> {
    let schema = dataset.schema();
    let mut idx = [0usize; 2];
    for (slot, name) in idx.iter_mut().zip([x, y]) {
        let i = schema.require(name)?;
        if !schema.columns()[i].kind.is_numeric() {
            return Err(PipelineError::NonNumeric(name.to_string()));
        }
        *slot = i;
    }

    dataset
        .records()
        .iter()
        .enumerate()
        .map(|(row, rec)| -> Result<[f64; 2], PipelineError> {
            let coord = |i: usize, name: &str| {
                rec.get(i).as_f64().ok_or_else(|| PipelineError::MissingValue {
                    column: name.to_string(),
                    row,
                })
            };
            Ok([coord(idx[0], x)?, coord(idx[1], y)?])
        })
        .collect()
}

/// Cluster a filtered subset on two coordinate columns.
///
/// * k = 0 and k above `options.max_clusters` are rejected.
/// * k = 1 returns the rows unchanged without reading the coordinates.
/// * k ≥ 2 appends `cluster` and `cluster_color` to a copy of the rows.
pub fn cluster(
    subset: &Dataset,
    x: &str,
    y: &str,
    k: usize,
    options: &KMeansOptions,
    palette: &Palette,
) -> Result<ClusterOutcome, PipelineError> {
    check_k(k, options)?;
    if k == 1 {
        return Ok(ClusterOutcome::Unclustered(subset.clone()));
    }
    let points = coordinates(subset, x, y)?;

    let distinct = {
        let mut pts: Vec<(u64, u64)> = points
            .iter()
            .map(|p| (p[0].to_bits(), p[1].to_bits()))
            .collect();
        pts.sort_unstable();
        pts.dedup();
        pts.len()
    };
    if distinct < k {
        log::warn!("k-means: k={k} exceeds {distinct} distinct points; some clusters will be empty");
    }

    let fit = kmeans(&points, k, options)?;
    let colors: Vec<String> = fit.labels.iter().map(|&l| palette.hex_for(l)).collect();

    let schema = subset.schema().extended(vec![
        Column::new(CLUSTER_COLUMN, ColumnKind::Integer),
        Column::new(COLOR_COLUMN, ColumnKind::Text),
    ])?;
    let records = subset
        .records()
        .iter()
        .zip(fit.labels.iter().zip(&colors))
        .map(|(rec, (&label, color))| {
            let mut values = rec.values.clone();
            values.push(Value::Integer(label as i64));
            values.push(Value::Text(color.clone()));
            Record::new(values)
        })
        .collect();
    let rows = Dataset::new(schema, records)?;

    Ok(ClusterOutcome::Clustered {
        rows,
        assignment: ClusterAssignment {
            k,
            labels: fit.labels,
            colors,
            centroids: fit.centroids,
            iterations: fit.iterations,
            converged: fit.converged,
        },
    })
}

//! Seeded synthetic datasets.
//!
//! Every generator draws from a `StdRng` seeded with the caller's seed, so the
//! same `(kind, seed)` always yields an identical [`Dataset`].

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::{Column, ColumnKind, Dataset, Record, Schema, Value};
use crate::error::PipelineError;

/// Which synthetic table to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SyntheticKind {
    /// Twelve months of average spend for five business categories (wide form).
    ConsumptionTrend,
    /// Ride pickups scattered around city hotspots.
    RidePickups { rows: usize },
    /// Per-person monthly spend by generation and business category.
    GenerationSpending { rows: usize },
}

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Business categories of the consumption table with their spend ranges.
pub const CONSUMPTION_CATEGORIES: [(&str, i64, i64); 5] = [
    ("food_beverage", 380_000, 520_000),
    ("fashion_beauty", 250_000, 400_000),
    ("travel_leisure", 150_000, 500_000),
    ("education_culture", 200_000, 300_000),
    ("living_appliances", 180_000, 280_000),
];

const TRAVEL_PEAK_AMPLITUDE: f64 = 80_000.0;

/// (name, lat, lon, weight)
const PICKUP_HOTSPOTS: [(&str, f64, f64, f64); 5] = [
    ("midtown", 40.7580, -73.9855, 0.40),
    ("downtown", 40.7075, -74.0113, 0.20),
    ("brooklyn", 40.6782, -73.9442, 0.15),
    ("laguardia", 40.7769, -73.8740, 0.12),
    ("jfk", 40.6413, -73.7781, 0.13),
];

const PICKUP_BASES: [&str; 5] = ["B02512", "B02598", "B02617", "B02682", "B02764"];

/// Relative pickup volume per hour of day, evening-heavy.
const HOURLY_WEIGHTS: [f64; 24] = [
    3.0, 2.0, 1.5, 1.0, 1.0, 1.5, 2.5, 4.0, 5.0, 4.5, 4.0, 4.0, 4.5, 4.5, 5.0, 5.5, 6.0, 7.0,
    7.5, 7.0, 6.5, 6.0, 5.0, 4.0,
];

const GENERATIONS: [(&str, i64, i64, f64); 3] = [
    // name, min age, max age, share buying online
    ("MZ", 20, 39, 0.75),
    ("Gen X", 40, 55, 0.50),
    ("Boomer", 56, 70, 0.25),
];

const SPENDING_CATEGORIES: [&str; 5] = [
    "Food & Beverage",
    "Fashion & Beauty",
    "Travel & Leisure",
    "Education & Culture",
    "Living & Appliances",
];

/// Mean monthly spend per generation (rows) and category (columns).
const SPENDING_MEANS: [[f64; 5]; 3] = [
    [420_000.0, 310_000.0, 280_000.0, 150_000.0, 120_000.0],
    [480_000.0, 220_000.0, 240_000.0, 260_000.0, 210_000.0],
    [390_000.0, 140_000.0, 200_000.0, 90_000.0, 230_000.0],
];

// ---------------------------------------------------------------------------
// Random helpers
// ---------------------------------------------------------------------------

/// Box-Muller transform for a normal sample.
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + std_dev * z
}

/// Index drawn in proportion to `weights`.
fn weighted_index(rng: &mut StdRng, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut pick = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if pick < *w {
            return i;
        }
        pick -= w;
    }
    weights.len() - 1
}

/// `n` evenly spaced points over `[start, end]`, endpoints included.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

pub fn generate(kind: SyntheticKind, seed: u64) -> Result<Dataset, PipelineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dataset = match kind {
        SyntheticKind::ConsumptionTrend => consumption_trend(&mut rng)?,
        SyntheticKind::RidePickups { rows } => ride_pickups(&mut rng, rows)?,
        SyntheticKind::GenerationSpending { rows } => generation_spending(&mut rng, rows)?,
    };
    log::debug!("generated {:?} with seed {seed}: {} rows", kind, dataset.len());
    Ok(dataset)
}

fn consumption_trend(rng: &mut StdRng) -> Result<Dataset, PipelineError> {
    let mut columns = vec![
        Column::new("month", ColumnKind::Integer),
        Column::new("month_label", ColumnKind::Text),
    ];
    columns.extend(
        CONSUMPTION_CATEGORIES
            .iter()
            .map(|(name, _, _)| Column::new(*name, ColumnKind::Float)),
    );
    let schema = Schema::new(columns)?;

    // Drawn column by column, matching how the table is laid out.
    let peak = linspace(0.0, 2.0 * PI, 12);
    let series: Vec<Vec<f64>> = CONSUMPTION_CATEGORIES
        .iter()
        .map(|&(name, lo, hi)| {
            (0..12)
                .map(|m| {
                    let base = rng.gen_range(lo..hi) as f64;
                    if name == "travel_leisure" {
                        base + peak[m].sin() * TRAVEL_PEAK_AMPLITUDE
                    } else {
                        base
                    }
                })
                .collect()
        })
        .collect();

    let records = (0..12)
        .map(|m| {
            let mut values = vec![Value::Integer(m as i64 + 1), MONTH_LABELS[m].into()];
            values.extend(series.iter().map(|s| Value::Float(s[m])));
            Record::new(values)
        })
        .collect();

    Dataset::new(schema, records)
}

fn ride_pickups(rng: &mut StdRng, rows: usize) -> Result<Dataset, PipelineError> {
    let schema = Schema::new(vec![
        Column::new("lat", ColumnKind::Float),
        Column::new("lon", ColumnKind::Float),
        Column::new("hour", ColumnKind::Integer),
        Column::new("base", ColumnKind::Text),
    ])?;

    let spot_weights: Vec<f64> = PICKUP_HOTSPOTS.iter().map(|h| h.3).collect();
    let records = (0..rows)
        .map(|_| {
            let (_, lat, lon, _) = PICKUP_HOTSPOTS[weighted_index(rng, &spot_weights)];
            let hour = weighted_index(rng, &HOURLY_WEIGHTS) as i64;
            let base = PICKUP_BASES[rng.gen_range(0..PICKUP_BASES.len())];
            Record::new(vec![
                Value::Float(gauss(rng, lat, 0.015)),
                Value::Float(gauss(rng, lon, 0.015)),
                Value::Integer(hour),
                base.into(),
            ])
        })
        .collect();

    Dataset::new(schema, records)
}

fn generation_spending(rng: &mut StdRng, rows: usize) -> Result<Dataset, PipelineError> {
    let schema = Schema::new(vec![
        Column::new("generation", ColumnKind::Text),
        Column::new("age", ColumnKind::Integer),
        Column::new("category", ColumnKind::Text),
        Column::new("amount", ColumnKind::Float),
        Column::new("channel", ColumnKind::Text),
    ])?;

    let records = (0..rows)
        .map(|_| {
            let g = rng.gen_range(0..GENERATIONS.len());
            let (generation, min_age, max_age, online_share) = GENERATIONS[g];
            let c = rng.gen_range(0..SPENDING_CATEGORIES.len());
            let mean = SPENDING_MEANS[g][c];
            let amount = gauss(rng, mean, mean * 0.2).max(0.0).round();
            let channel = if rng.gen_bool(online_share) {
                "online"
            } else {
                "offline"
            };
            Record::new(vec![
                generation.into(),
                Value::Integer(rng.gen_range(min_age..=max_age)),
                SPENDING_CATEGORIES[c].into(),
                Value::Float(amount),
                channel.into(),
            ])
        })
        .collect();

    Dataset::new(schema, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_dataset() {
        for kind in [
            SyntheticKind::ConsumptionTrend,
            SyntheticKind::RidePickups { rows: 200 },
            SyntheticKind::GenerationSpending { rows: 200 },
        ] {
            assert_eq!(generate(kind, 42).unwrap(), generate(kind, 42).unwrap());
        }
    }

    #[test]
    fn different_seed_different_dataset() {
        let kind = SyntheticKind::RidePickups { rows: 50 };
        assert_ne!(generate(kind, 1).unwrap(), generate(kind, 2).unwrap());
    }

    #[test]
    fn consumption_table_shape_and_ranges() {
        let ds = generate(SyntheticKind::ConsumptionTrend, 42).unwrap();
        assert_eq!(ds.len(), 12);
        assert_eq!(ds.schema().len(), 7);
        for v in ds.column_values("food_beverage").unwrap() {
            let v = v.as_f64().unwrap();
            assert!((380_000.0..520_000.0).contains(&v));
        }
        let months: Vec<i64> = ds
            .column_values("month")
            .unwrap()
            .filter_map(Value::as_i64)
            .collect();
        assert_eq!(months, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn pickup_hours_stay_in_day() {
        let ds = generate(SyntheticKind::RidePickups { rows: 500 }, 7).unwrap();
        assert_eq!(ds.len(), 500);
        assert!(ds
            .column_values("hour")
            .unwrap()
            .all(|h| (0..24).contains(&h.as_i64().unwrap())));
    }

    #[test]
    fn spending_ages_match_generation() {
        let ds = generate(SyntheticKind::GenerationSpending { rows: 300 }, 3).unwrap();
        let g = ds.schema().index_of("generation").unwrap();
        let a = ds.schema().index_of("age").unwrap();
        for rec in ds.records() {
            let age = rec.get(a).as_i64().unwrap();
            if rec.get(g) == &Value::from("MZ") {
                assert!((20..=39).contains(&age));
            }
            assert!(rec.get(3).as_f64().unwrap() >= 0.0);
        }
    }

    #[test]
    fn linspace_includes_endpoints() {
        let xs = linspace(0.0, 1.0, 5);
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}

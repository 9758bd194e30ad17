use proptest::prelude::*;

use dashboard_pipeline::data::synthetic::generate;
use dashboard_pipeline::{
    filter, filtered_indices, histogram, kmeans, Column, ColumnKind, Criterion, Dataset,
    FilterCriteria, FilterOutcome, KMeansOptions, Record, Schema, SyntheticKind, Value,
};

const CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];

fn dataset_from(rows: &[(usize, i64, f64)]) -> Dataset {
    let schema = Schema::new(vec![
        Column::new("category", ColumnKind::Text),
        Column::new("hour", ColumnKind::Integer),
        Column::new("amount", ColumnKind::Float),
    ])
    .unwrap();
    let records = rows
        .iter()
        .map(|&(c, h, a)| Record::new(vec![CATEGORIES[c].into(), Value::Integer(h), Value::Float(a)]))
        .collect();
    Dataset::new(schema, records).unwrap()
}

fn rows_strategy() -> impl Strategy<Value = Vec<(usize, i64, f64)>> {
    prop::collection::vec((0..CATEGORIES.len(), -3i64..30, -1000.0f64..1000.0), 0..80)
}

proptest! {
    #[test]
    fn synthetic_generation_is_deterministic(seed in any::<u64>(), rows in 0usize..200) {
        for kind in [
            SyntheticKind::ConsumptionTrend,
            SyntheticKind::RidePickups { rows },
            SyntheticKind::GenerationSpending { rows },
        ] {
            prop_assert_eq!(generate(kind, seed).unwrap(), generate(kind, seed).unwrap());
        }
    }

    #[test]
    fn filtered_rows_satisfy_criteria_and_come_from_input(
        rows in rows_strategy(),
        picked in prop::collection::btree_set(0..CATEGORIES.len(), 0..4),
        hour_max in 0i64..24,
    ) {
        let ds = dataset_from(&rows);
        let categories: Vec<&str> = picked.iter().map(|&i| CATEGORIES[i]).collect();
        let criteria = FilterCriteria::from([
            ("category".to_string(), Criterion::one_of(categories.clone())),
            ("hour".to_string(), Criterion::Range { min: Some(0.0), max: Some(hour_max as f64) }),
        ]);

        match filter(&ds, &criteria).unwrap() {
            FilterOutcome::NoData => {
                prop_assert!(filtered_indices(&ds, &criteria).unwrap().is_empty());
            }
            FilterOutcome::Rows(subset) => {
                prop_assert_eq!(subset.schema(), ds.schema());
                for rec in subset.records() {
                    prop_assert!(ds.records().contains(rec));
                    let Value::Text(cat) = rec.get(0) else { panic!("text column") };
                    prop_assert!(categories.contains(&cat.as_str()));
                    let h = rec.get(1).as_i64().unwrap();
                    prop_assert!((0..=hour_max).contains(&h));
                }
            }
        }
    }

    #[test]
    fn empty_criteria_keep_every_row(rows in rows_strategy()) {
        let ds = dataset_from(&rows);
        match filter(&ds, &FilterCriteria::new()).unwrap() {
            FilterOutcome::Rows(all) => prop_assert_eq!(all.len(), ds.len()),
            FilterOutcome::NoData => prop_assert!(ds.is_empty()),
        }
    }

    #[test]
    fn histogram_sums_to_in_range_count(rows in rows_strategy(), buckets in 1usize..30) {
        let ds = dataset_from(&rows);
        let h = histogram(&ds, "hour", buckets).unwrap();
        let in_range = rows.iter().filter(|r| r.1 >= 0 && (r.1 as usize) < buckets).count();
        prop_assert_eq!(h.counts.len(), buckets);
        prop_assert_eq!(h.total() as usize, in_range);
    }

    #[test]
    fn kmeans_labels_stay_in_range(
        points in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 1..60),
        k in 1usize..8,
        seed in any::<u64>(),
    ) {
        let pts: Vec<[f64; 2]> = points.iter().map(|&(x, y)| [x, y]).collect();
        let opts = KMeansOptions { seed, max_iterations: 100, ..Default::default() };
        let fit = kmeans(&pts, k, &opts).unwrap();
        prop_assert_eq!(fit.labels.len(), pts.len());
        prop_assert_eq!(fit.centroids.len(), k);
        prop_assert!(fit.labels.iter().all(|&l| l < k));
        prop_assert_eq!(&fit, &kmeans(&pts, k, &opts).unwrap());
    }
}

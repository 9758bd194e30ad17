//! End-to-end scenarios: load → filter → aggregate/cluster through the
//! public API.

use std::collections::BTreeSet;
use std::sync::Arc;

use approx::assert_relative_eq;
use dashboard_pipeline::data::columnar::to_record_batch;
use dashboard_pipeline::data::synthetic::CONSUMPTION_CATEGORIES;
use dashboard_pipeline::{
    cluster, describe, describe_columns, filter, group_mean, melt, Column, ColumnKind, Criterion,
    Dataset, FilterCriteria, FilterOutcome, KMeansOptions, LoadError, Palette, PipelineConfig,
    PipelineOutput, PipelineRequest, Record, Schema, Session, Source, SyntheticKind, Value,
};

// ============================================================================
// Helpers
// ============================================================================

fn hours_dataset() -> Dataset {
    let schema = Schema::new(vec![
        Column::new("hour", ColumnKind::Integer),
        Column::new("lat", ColumnKind::Float),
    ])
    .unwrap();
    let records = [5, 5, 17, 17]
        .iter()
        .enumerate()
        .map(|(i, &h)| Record::new(vec![Value::Integer(h), Value::Float(40.0 + i as f64)]))
        .collect();
    Dataset::new(schema, records).unwrap()
}

fn hour_is(h: i64) -> FilterCriteria {
    FilterCriteria::from([("hour".to_string(), Criterion::equals(h))])
}

// ============================================================================
// Filtering scenarios
// ============================================================================

#[test]
fn hour_filter_selects_matching_records() {
    let ds = hours_dataset();
    let FilterOutcome::Rows(rows) = filter(&ds, &hour_is(17)).unwrap() else {
        panic!("expected rows for hour 17");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.records(), &ds.records()[2..]);
}

#[test]
fn hour_without_records_is_no_data() {
    let ds = hours_dataset();
    assert_eq!(filter(&ds, &hour_is(3)).unwrap(), FilterOutcome::NoData);

    let out = dashboard_pipeline::Pipeline::default()
        .run(&ds, &PipelineRequest::new(hour_is(3)).describe())
        .unwrap();
    assert_eq!(out, PipelineOutput::NoData);
}

// ============================================================================
// Aggregation scenarios
// ============================================================================

#[test]
fn business_group_means() {
    let schema = Schema::new(vec![
        Column::new("business", ColumnKind::Text),
        Column::new("spend", ColumnKind::Float),
    ])
    .unwrap();
    let ds = Dataset::new(
        schema,
        vec![
            Record::new(vec!["A".into(), 100.0.into()]),
            Record::new(vec!["A".into(), 200.0.into()]),
            Record::new(vec!["B".into(), 50.0.into()]),
        ],
    )
    .unwrap();

    let groups = group_mean(&ds, "business", "spend").unwrap();
    let keys: Vec<_> = groups.iter().map(|g| g.key.clone()).collect();
    assert_eq!(keys, vec![Value::from("A"), Value::from("B")]);
    assert_relative_eq!(groups[0].mean, 150.0);
    assert_relative_eq!(groups[1].mean, 50.0);
}

#[test]
fn consumption_dashboard_flow() {
    let mut session = Session::default();
    let source = Source::Synthetic {
        kind: SyntheticKind::ConsumptionTrend,
        seed: 42,
    };
    let wide = session.load(&source).dataset.clone();

    // One summary row per category column plus the month column.
    let summary = describe(&wide);
    assert_eq!(summary.len(), 6);
    assert!(summary.iter().all(|s| s.count == 12));

    // Category statistics leave the month index out.
    let names: Vec<&str> = CONSUMPTION_CATEGORIES.iter().map(|(name, _, _)| *name).collect();
    let per_category = describe_columns(&wide, &names).unwrap();
    assert_eq!(per_category.len(), 5);
    assert!(per_category.iter().all(|s| s.column != "month"));

    let long = melt(&wide, &["month", "month_label"], "category", "amount").unwrap();
    let request = PipelineRequest::new(FilterCriteria::from([(
        "category".to_string(),
        Criterion::one_of(["travel_leisure"]),
    )]))
    .group_mean("category", "amount");
    let out = dashboard_pipeline::Pipeline::default().run(&long, &request).unwrap();
    let report = out.report().unwrap();
    assert_eq!(report.row_count, 12);
    let groups = report.group_means.as_ref().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].count, 12);
}

// ============================================================================
// Clustering scenarios
// ============================================================================

#[test]
fn k_one_leaves_records_identical() {
    let ds = hours_dataset();
    let out = cluster(&ds, "hour", "lat", 1, &KMeansOptions::default(), &Palette::default()).unwrap();
    assert_eq!(out.rows(), &ds);
    assert_eq!(out.rows().schema().len(), 2);
}

#[test]
fn pickup_clusters_are_reproducible() {
    let mut session = Session::default();
    let source = Source::Synthetic {
        kind: SyntheticKind::RidePickups { rows: 100 },
        seed: 9,
    };
    let request = PipelineRequest::default().cluster("lat", "lon", 3);
    let first = session.run(&source, &request).unwrap();
    let second = Session::default().run(&source, &request).unwrap();

    let labels = |i: &dashboard_pipeline::Interaction| {
        i.output.report().unwrap().clusters.as_ref().unwrap().labels.clone()
    };
    let a = labels(&first);
    assert_eq!(a.len(), 100);
    assert!(a.iter().all(|l| [0, 1, 2].contains(l)));
    assert_eq!(a, labels(&second));
}

// ============================================================================
// Loading scenarios
// ============================================================================

#[test]
fn synthetic_sources_are_cached_per_session() {
    let mut session = Session::new(PipelineConfig {
        seed: 5,
        ..Default::default()
    });
    let source = Source::Synthetic {
        kind: SyntheticKind::GenerationSpending { rows: 30 },
        seed: 5,
    };
    let a = session.load(&source);
    let b = session.load(&source);
    assert!(Arc::ptr_eq(&a.dataset, &b.dataset));
}

#[test]
fn remote_failure_yields_empty_dataset() {
    let loaded = dashboard_pipeline::load(
        &Source::Remote {
            url: "http://127.0.0.1:9/uber-raw-data-sep14.csv".into(),
            row_limit: 100_000,
        },
        &PipelineConfig::default(),
    );
    assert!(loaded.dataset.is_empty());
    assert!(matches!(loaded.error, Some(LoadError::Fetch { .. })));
}

#[test]
fn parquet_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spending.parquet");
    let original = dashboard_pipeline::data::synthetic::generate(
        SyntheticKind::GenerationSpending { rows: 40 },
        11,
    )
    .unwrap();

    let batch = to_record_batch(&original).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = parquet::arrow::ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let loaded = dashboard_pipeline::load(&Source::File { path }, &PipelineConfig::default());
    assert!(loaded.is_ok());
    assert_eq!(*loaded.dataset, original);
}

#[test]
fn csv_file_with_timestamps_gets_hours() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pickups.csv");
    std::fs::write(
        &path,
        "date/time,lat,lon\n2014-09-01 17:05:00,40.7,-73.9\n2014-09-01 05:30:00,40.6,-73.8\n",
    )
    .unwrap();

    let loaded = dashboard_pipeline::load(&Source::File { path }, &PipelineConfig::default());
    let hours: BTreeSet<_> = loaded
        .dataset
        .column_values("hour")
        .unwrap()
        .cloned()
        .collect();
    assert_eq!(hours, BTreeSet::from([Value::Integer(5), Value::Integer(17)]));
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parquet::arrow::ArrowWriter;

use dashboard_pipeline::data::columnar::{to_arrow_schema, to_record_batch};
use dashboard_pipeline::data::synthetic::generate;
use dashboard_pipeline::{Dataset, SyntheticKind};

/// Write the synthetic dashboard datasets to disk (parquet + CSV).
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Rows for the pickup and spending tables
    #[arg(long, default_value_t = 10_000)]
    rows: usize,
}

fn write_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
    let schema = Arc::new(to_arrow_schema(dataset.schema()));
    let batch = to_record_batch(dataset)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(dataset.schema().names())?;
    for rec in dataset.records() {
        writer.write_record(rec.values.iter().map(|v| {
            if v.is_null() {
                String::new()
            } else if let Some(f) = v.as_f64().filter(|_| v.as_i64().is_none()) {
                // Full precision with a decimal point, so reloads infer Float.
                format!("{f:?}")
            } else {
                v.to_string()
            }
        }))?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let tables = [
        ("consumption", SyntheticKind::ConsumptionTrend),
        ("pickups", SyntheticKind::RidePickups { rows: args.rows }),
        ("spending", SyntheticKind::GenerationSpending { rows: args.rows }),
    ];

    for (name, kind) in tables {
        let dataset = generate(kind, args.seed)?;
        let parquet_path = args.output.join(format!("{name}.parquet"));
        let csv_path = args.output.join(format!("{name}.csv"));
        write_parquet(&dataset, &parquet_path)?;
        write_csv(&dataset, &csv_path)?;
        println!(
            "Wrote {} rows ({} columns) to {} and {}",
            dataset.len(),
            dataset.schema().len(),
            parquet_path.display(),
            csv_path.display()
        );
    }
    Ok(())
}

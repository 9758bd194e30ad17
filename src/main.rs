use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use dashboard_pipeline::data::synthetic::CONSUMPTION_CATEGORIES;
use dashboard_pipeline::render::{render_output, summary_table};
use dashboard_pipeline::{
    describe_columns, melt, Criterion, Dataset, FilterCriteria, Pipeline, PipelineConfig,
    PipelineOutput, PipelineRequest, Session, Source, SyntheticKind, Value,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Filter, aggregate and cluster dashboard datasets",
    long_about = "Runs one dashboard interaction and prints the resulting tables.\n\n\
                  EXAMPLES:\n  \
                  # Monthly spend for two categories\n  \
                  dashboard-pipeline trends --category food_beverage --category travel_leisure\n\n  \
                  # Pickups at 17h grouped into 5 clusters\n  \
                  dashboard-pipeline pickups --hour 17 --clusters 5\n\n  \
                  # Mean spend per category for the MZ generation\n  \
                  dashboard-pipeline spending --generation MZ\n\n  \
                  # Arbitrary filters over a local file\n  \
                  dashboard-pipeline query --file data.csv --eq hour=17 --group-by base --mean lat"
)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print the report as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Maximum number of data rows to print
    #[arg(long, global = true, default_value_t = 20)]
    max_rows: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monthly consumption trend per business category
    Trends {
        /// Categories to show (repeatable); all when omitted
        #[arg(long)]
        category: Vec<String>,
    },
    /// Ride pickups by hour with optional k-means clustering
    Pickups {
        #[command(flatten)]
        source: SourceArgs,

        /// Hour of day to keep
        #[arg(long)]
        hour: Option<i64>,

        /// Number of clusters (1 disables clustering)
        #[arg(long, default_value_t = 1)]
        clusters: usize,

        /// Synthetic rows when no file/url is given
        #[arg(long, default_value_t = 5_000)]
        rows: usize,
    },
    /// Spending by generation and business category
    Spending {
        #[arg(long)]
        generation: Vec<String>,

        #[arg(long)]
        category: Vec<String>,

        #[arg(long)]
        min_age: Option<f64>,

        #[arg(long)]
        max_age: Option<f64>,

        #[arg(long, default_value_t = 2_000)]
        rows: usize,
    },
    /// Generic filter/aggregate over any source
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Local .csv/.json/.parquet file
    #[arg(long, conflicts_with = "url")]
    file: Option<PathBuf>,

    /// Remote CSV url
    #[arg(long)]
    url: Option<String>,

    /// Row cap for remote sources (defaults to the configured limit)
    #[arg(long)]
    row_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSynthetic {
    Consumption,
    Pickups,
    Spending,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Synthetic dataset when no file/url is given
    #[arg(long, value_enum, default_value_t = CliSynthetic::Pickups)]
    synthetic: CliSynthetic,

    #[arg(long, default_value_t = 1_000)]
    rows: usize,

    /// Exact match, `column=value` (repeatable)
    #[arg(long = "eq")]
    equals: Vec<String>,

    /// Membership, `column=a,b,c` (repeatable)
    #[arg(long = "in")]
    one_of: Vec<String>,

    /// Inclusive range, `column=min..max` (either side may be empty)
    #[arg(long)]
    range: Vec<String>,

    /// Group-by column for a group mean
    #[arg(long, requires = "mean")]
    group_by: Option<String>,

    /// Value column for a group mean
    #[arg(long, requires = "group_by")]
    mean: Option<String>,

    /// Integer column for a histogram
    #[arg(long)]
    histogram: Option<String>,

    /// Histogram bucket count (defaults to the configured value)
    #[arg(long)]
    buckets: Option<usize>,

    /// Print descriptive statistics
    #[arg(long)]
    describe: bool,

    /// Cluster on `x,y,k`
    #[arg(long)]
    cluster: Option<String>,
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=')
        .with_context(|| format!("expected column=value, got '{arg}'"))
}

fn typed_value(dataset: &Dataset, column: &str, text: &str) -> Result<Value> {
    let col = dataset
        .schema()
        .column(column)
        .with_context(|| format!("unknown column '{column}'"))?;
    let value = Value::parse_as(text, col.kind);
    if value.is_null() {
        bail!("'{text}' is not a valid {:?} for column '{column}'", col.kind);
    }
    Ok(value)
}

fn parse_bound(text: &str) -> Result<Option<f64>> {
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(text.parse().with_context(|| format!("bad bound '{text}'"))?))
}

fn criteria_from_args(dataset: &Dataset, args: &QueryArgs) -> Result<FilterCriteria> {
    let mut criteria = FilterCriteria::new();
    for arg in &args.equals {
        let (col, text) = split_assignment(arg)?;
        criteria.insert(col.to_string(), Criterion::Equals(typed_value(dataset, col, text)?));
    }
    for arg in &args.one_of {
        let (col, list) = split_assignment(arg)?;
        let values: BTreeSet<Value> = list
            .split(',')
            .map(|t| typed_value(dataset, col, t.trim()))
            .collect::<Result<_>>()?;
        criteria.insert(col.to_string(), Criterion::OneOf(values));
    }
    for arg in &args.range {
        let (col, bounds) = split_assignment(arg)?;
        let (lo, hi) = bounds
            .split_once("..")
            .with_context(|| format!("expected min..max, got '{bounds}'"))?;
        criteria.insert(
            col.to_string(),
            Criterion::Range {
                min: parse_bound(lo)?,
                max: parse_bound(hi)?,
            },
        );
    }
    Ok(criteria)
}

fn resolve_source(args: &SourceArgs, fallback: Source, config: &PipelineConfig) -> Source {
    match (&args.file, &args.url) {
        (Some(path), _) => Source::File { path: path.clone() },
        (None, Some(url)) => Source::Remote {
            url: url.clone(),
            row_limit: args.row_limit.unwrap_or(config.remote_row_limit),
        },
        (None, None) => fallback,
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn emit(cli: &Cli, output: &PipelineOutput, group_column: Option<&str>) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(output)?);
    } else {
        print!("{}", render_output(output, group_column, cli.max_rows)?);
    }
    Ok(())
}

fn load_or_report(session: &mut Session, source: &Source) -> Option<std::sync::Arc<Dataset>> {
    let loaded = session.load(source);
    match &loaded.error {
        Some(e) => {
            eprintln!("Error: {e}");
            None
        }
        None => Some(loaded.dataset.clone()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_trends(cli: &Cli, session: &mut Session, categories: &[String]) -> Result<()> {
    let source = Source::Synthetic {
        kind: SyntheticKind::ConsumptionTrend,
        seed: session.config().seed,
    };
    let Some(wide) = load_or_report(session, &source) else {
        return Ok(());
    };
    let long = melt(&wide, &["month", "month_label"], "category", "amount")?;

    let mut criteria = FilterCriteria::new();
    if !categories.is_empty() {
        for c in categories {
            if !CONSUMPTION_CATEGORIES.iter().any(|(name, _, _)| name == c) {
                bail!("unknown category '{c}'");
            }
        }
        criteria.insert("category".into(), Criterion::one_of(categories.iter().cloned()));
    }
    let request = PipelineRequest::new(criteria).group_mean("category", "amount");
    let output = Pipeline::from_config(session.config()).run(&long, &request)?;
    emit(cli, &output, Some("category"))?;

    if !cli.json {
        // Per-category statistics are taken over the wide table.
        println!("\nPer-category statistics (all months):");
        let names: Vec<&str> = CONSUMPTION_CATEGORIES.iter().map(|(name, _, _)| *name).collect();
        let summary = describe_columns(&wide, &names)?;
        let table = summary_table(&summary)?;
        println!("{}", dashboard_pipeline::data::columnar::pretty_table(&table)?);
    }
    Ok(())
}

fn run_pickups(
    cli: &Cli,
    session: &mut Session,
    source_args: &SourceArgs,
    hour: Option<i64>,
    clusters: usize,
    rows: usize,
) -> Result<()> {
    let fallback = Source::Synthetic {
        kind: SyntheticKind::RidePickups { rows },
        seed: session.config().seed,
    };
    let source = resolve_source(source_args, fallback, session.config());

    let mut criteria = FilterCriteria::new();
    if let Some(h) = hour {
        if !(0..24).contains(&h) {
            bail!("hour must be in 0..24, got {h}");
        }
        criteria.insert("hour".into(), Criterion::equals(h));
    }
    let request = PipelineRequest::new(criteria)
        .histogram("hour", session.config().histogram_buckets)
        .cluster("lat", "lon", clusters);

    let interaction = session.run(&source, &request)?;
    if let Some(e) = &interaction.load_error {
        eprintln!("Error: {e}");
        return Ok(());
    }
    emit(cli, &interaction.output, None)
}

fn run_spending(
    cli: &Cli,
    session: &mut Session,
    generations: &[String],
    categories: &[String],
    age: (Option<f64>, Option<f64>),
    rows: usize,
) -> Result<()> {
    let source = Source::Synthetic {
        kind: SyntheticKind::GenerationSpending { rows },
        seed: session.config().seed,
    };

    let mut criteria = FilterCriteria::new();
    if !generations.is_empty() {
        criteria.insert("generation".into(), Criterion::one_of(generations.iter().cloned()));
    }
    if !categories.is_empty() {
        criteria.insert("category".into(), Criterion::one_of(categories.iter().cloned()));
    }
    if age.0.is_some() || age.1.is_some() {
        criteria.insert("age".into(), Criterion::Range { min: age.0, max: age.1 });
    }
    let request = PipelineRequest::new(criteria)
        .group_mean("category", "amount")
        .describe();

    let interaction = session.run(&source, &request)?;
    if let Some(e) = &interaction.load_error {
        eprintln!("Error: {e}");
        return Ok(());
    }
    emit(cli, &interaction.output, Some("category"))
}

fn run_query(cli: &Cli, session: &mut Session, args: &QueryArgs) -> Result<()> {
    let kind = match args.synthetic {
        CliSynthetic::Consumption => SyntheticKind::ConsumptionTrend,
        CliSynthetic::Pickups => SyntheticKind::RidePickups { rows: args.rows },
        CliSynthetic::Spending => SyntheticKind::GenerationSpending { rows: args.rows },
    };
    let fallback = Source::Synthetic {
        kind,
        seed: session.config().seed,
    };
    let source = resolve_source(&args.source, fallback, session.config());
    let Some(dataset) = load_or_report(session, &source) else {
        return Ok(());
    };

    let mut request = PipelineRequest::new(criteria_from_args(&dataset, args)?);
    if let (Some(group), Some(value)) = (&args.group_by, &args.mean) {
        request = request.group_mean(group, value);
    }
    if let Some(col) = &args.histogram {
        request = request.histogram(col, args.buckets.unwrap_or(session.config().histogram_buckets));
    }
    if args.describe {
        request = request.describe();
    }
    if let Some(arg) = &args.cluster {
        let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
        let [x, y, k] = parts.as_slice() else {
            bail!("expected --cluster x,y,k, got '{arg}'");
        };
        let k: usize = k.parse().with_context(|| format!("bad cluster count '{k}'"))?;
        request = request.cluster(x, y, k);
    }

    let interaction = session.run(&source, &request)?;
    emit(cli, &interaction.output, args.group_by.as_deref())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    log::debug!("config: {config:?}");

    let mut session = Session::new(config);
    match &cli.command {
        Command::Trends { category } => run_trends(&cli, &mut session, category),
        Command::Pickups {
            source,
            hour,
            clusters,
            rows,
        } => run_pickups(&cli, &mut session, source, *hour, *clusters, *rows),
        Command::Spending {
            generation,
            category,
            min_age,
            max_age,
            rows,
        } => run_spending(
            &cli,
            &mut session,
            generation,
            category,
            (*min_age, *max_age),
            *rows,
        ),
        Command::Query(args) => run_query(&cli, &mut session, args),
    }
}

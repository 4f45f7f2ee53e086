//! FundLens: fundraising dashboard CLI
//!
//! Entrypoint that loads the dataset, applies the requested filters, and
//! prints or renders the dashboard aggregates.

use anyhow::{Context, Result};
use clap::Parser;
use fundlens::{report, viz, Args, Dataset, DashboardReport};
use std::time::Instant;
use tracing::{debug, info, trace};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);
    args.validate()?;

    let start_time = Instant::now();
    let dataset = Dataset::load(&args.input)
        .with_context(|| format!("Failed to load donations from {}", args.input.display()))?;

    let summary = dataset.summary();
    info!(
        records = summary.records,
        undated = summary.undated,
        grand_total = summary.grand_total,
        "Dataset loaded in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    if args.list_filters {
        println!("{}", report::render_filter_options(&dataset.filter_options()));
        return Ok(());
    }

    run_dashboard(&args, &dataset)
}

/// Logs go to stderr so stdout carries only the report
fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(args.verbose >= 2)
        .with_line_number(args.verbose >= 3)
        .init();

    debug!("FundLens started with verbosity level: {}", args.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

/// Filter, aggregate and present
fn run_dashboard(args: &Args, dataset: &Dataset) -> Result<()> {
    // Step 1: Filter
    let filter = args.filter();
    let filtered = dataset.filter(&filter);
    if filter.is_unconstrained() {
        debug!("No filters applied");
    }
    info!("{} of {} rows match the filters", filtered.len(), dataset.len());

    // Step 2: Aggregate
    let aggregate_start = Instant::now();
    let dashboard = DashboardReport::build(&filtered, &filter, &args.report_settings());
    debug!(
        "Aggregation time: {:.3}s",
        aggregate_start.elapsed().as_secs_f64()
    );

    // Step 3: Present
    if args.json {
        println!("{}", dashboard.to_json()?);
    } else {
        println!("{}", dashboard.render_tables());
    }

    // Step 4: Charts
    if let Some(dir) = &args.charts {
        let viz_start = Instant::now();
        let written = viz::generate_chart_report(&dashboard, args.low_bins, args.high_bins, dir)
            .with_context(|| format!("Failed to render charts into {}", dir.display()))?;
        info!(
            "Rendered {} charts in {:.2}s",
            written.len(),
            viz_start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

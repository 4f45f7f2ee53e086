//! Command-line interface definitions and argument parsing

use crate::aggregate::{DEFAULT_SPIKE_K, DEFAULT_TOP_N, DEFAULT_VALUE_THRESHOLD};
use crate::data::{Filter, Selection};
use crate::report::ReportSettings;
use crate::viz::{HIGH_BUCKET_BINS, LOW_BUCKET_BINS};
use clap::Parser;
use std::path::PathBuf;

/// Fundraising dashboard: monthly trends, spikes, fund rankings and gift statistics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "donations.csv", env = "FUNDLENS_INPUT")]
    pub input: PathBuf,

    /// Restrict to one year ("All" for every year)
    #[arg(long, default_value = "All")]
    pub year: Selection<i32>,

    /// Restrict to one payment method (cc_type)
    #[arg(long, default_value = "All")]
    pub payment_method: Selection<String>,

    /// Restrict to one fund (designation name)
    #[arg(long, default_value = "All")]
    pub fund: Selection<String>,

    /// Restrict to one donation type
    #[arg(long, default_value = "All")]
    pub donation_type: Selection<String>,

    /// Standard deviations from the mean that make a month a spike or dip
    #[arg(long, default_value_t = DEFAULT_SPIKE_K)]
    pub spike_k: f64,

    /// Number of funds in the top and bottom rankings
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Contribution amount separating small from large gifts
    #[arg(long, default_value_t = DEFAULT_VALUE_THRESHOLD)]
    pub threshold: f64,

    /// Histogram bins for small contributions
    #[arg(long, default_value_t = LOW_BUCKET_BINS)]
    pub low_bins: usize,

    /// Histogram bins for large contributions
    #[arg(long, default_value_t = HIGH_BUCKET_BINS)]
    pub high_bins: usize,

    /// Directory to write SVG charts into
    #[arg(short = 'o', long, env = "FUNDLENS_CHARTS")]
    pub charts: Option<PathBuf>,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    pub json: bool,

    /// List the available filter values and exit
    #[arg(long)]
    pub list_filters: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Reject settings the aggregations cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.top_n == 0 {
            anyhow::bail!("--top-n must be at least 1");
        }
        if !self.spike_k.is_finite() || self.spike_k < 0.0 {
            anyhow::bail!("--spike-k must be a non-negative number, got {}", self.spike_k);
        }
        if !self.threshold.is_finite() {
            anyhow::bail!("--threshold must be a finite number");
        }
        if self.low_bins == 0 || self.high_bins == 0 {
            anyhow::bail!("Histogram bin counts must be at least 1");
        }
        Ok(())
    }

    pub fn filter(&self) -> Filter {
        Filter {
            year: self.year.clone(),
            payment_method: self.payment_method.clone(),
            fund: self.fund.clone(),
            donation_type: self.donation_type.clone(),
        }
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            spike_k: self.spike_k,
            top_n: self.top_n,
            value_threshold: self.threshold,
        }
    }

    /// Tracing filter directive for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

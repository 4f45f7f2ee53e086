//! FundLens: fundraising donation analytics
//!
//! Loads a donation dataset, applies equality filters and computes the
//! dashboard aggregates: monthly trends with year-over-year change,
//! spike/dip months, top and bottom funds, gift-level statistics per
//! donation type and payment method, and contribution-size buckets.

pub mod aggregate;
pub mod cli;
pub mod data;
pub mod error;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{
    fund_rankings, gift_level_stats, monthly_totals, spikes_and_dips, value_distribution_buckets,
    GroupDimension,
};
pub use cli::Args;
pub use data::{load_donations, Dataset, DonationRecord, Filter, Selection};
pub use error::{DataError, DataResult};
pub use report::{DashboardReport, ReportSettings};
pub use viz::generate_chart_report;

/// Common result type used by the CLI and chart rendering
pub type Result<T> = anyhow::Result<T>;

//! Report assembly, display formatting and console tables
//!
//! Aggregation returns raw numbers; this module is where they become
//! currency strings, percentages and month labels.

use crate::aggregate::{
    self, CategoryTotal, FundRankings, FundTotal, GiftStatsTable, GroupDimension, MonthOfYearTotal,
    MonthlyTotal, SpikesAndDips, ValueBuckets, YearTotal, SUBTOTAL_LABEL,
};
use crate::data::{DatasetSummary, DonationRecord, Filter, FilterOptions, ALL};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use serde::Serialize;
use std::fmt::Write;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Tunables for building a [`DashboardReport`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub spike_k: f64,
    pub top_n: usize,
    pub value_threshold: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            spike_k: aggregate::DEFAULT_SPIKE_K,
            top_n: aggregate::DEFAULT_TOP_N,
            value_threshold: aggregate::DEFAULT_VALUE_THRESHOLD,
        }
    }
}

/// Applied filter values as display strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSummary {
    pub year: String,
    pub payment_method: String,
    pub fund: String,
    pub donation_type: String,
}

impl From<&Filter> for FilterSummary {
    fn from(filter: &Filter) -> Self {
        Self {
            year: filter.year.to_string(),
            payment_method: filter.payment_method.to_string(),
            fund: filter.fund.to_string(),
            donation_type: filter.donation_type.to_string(),
        }
    }
}

/// Counts and totals of the two contribution-size buckets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub threshold: f64,
    pub low_count: usize,
    pub low_total: f64,
    pub high_count: usize,
    pub high_total: f64,
}

impl DistributionSummary {
    fn from_buckets(buckets: &ValueBuckets<'_>, threshold: f64) -> Self {
        fn total(rows: &[&DonationRecord]) -> f64 {
            rows.iter().map(|r| r.designated_value).sum()
        }

        Self {
            threshold,
            low_count: buckets.low.len(),
            low_total: total(&buckets.low),
            high_count: buckets.high.len(),
            high_total: total(&buckets.high),
        }
    }
}

/// Every aggregate the dashboard shows, computed over one filtered record set
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport<'a> {
    pub filter: FilterSummary,
    pub summary: DatasetSummary,
    pub monthly: Vec<MonthlyTotal>,
    pub monthly_by_year: Vec<MonthOfYearTotal>,
    pub yearly: Vec<YearTotal>,
    pub spikes_and_dips: SpikesAndDips,
    pub spike_k: f64,
    pub fund_rankings: FundRankings,
    pub donation_type_stats: GiftStatsTable,
    pub payment_method_stats: GiftStatsTable,
    pub donation_type_totals: Vec<CategoryTotal>,
    pub payment_method_totals: Vec<CategoryTotal>,
    pub distribution: DistributionSummary,
    #[serde(skip)]
    pub buckets: ValueBuckets<'a>,
}

impl<'a> DashboardReport<'a> {
    /// Compute every dashboard aggregate over one filtered record set.
    ///
    /// # Arguments
    /// * `records` - Rows already narrowed by `filter`
    /// * `filter` - The filter that produced `records`, kept for display
    /// * `settings` - Spike sensitivity, ranking size and bucket threshold
    ///
    /// # Returns
    /// A report borrowing `records` for the distribution buckets.
    pub fn build(
        records: &'a [DonationRecord],
        filter: &Filter,
        settings: &ReportSettings,
    ) -> Self {
        let buckets = aggregate::value_distribution_buckets(records, settings.value_threshold);

        Self {
            filter: FilterSummary::from(filter),
            summary: DatasetSummary::from_records(records),
            monthly: aggregate::monthly_totals(records),
            monthly_by_year: aggregate::monthly_totals_by_year(records),
            yearly: aggregate::yearly_totals(records),
            spikes_and_dips: aggregate::spikes_and_dips(records, settings.spike_k),
            spike_k: settings.spike_k,
            fund_rankings: aggregate::fund_rankings(records, settings.top_n),
            donation_type_stats: aggregate::gift_level_stats(records, GroupDimension::DonationType),
            payment_method_stats: aggregate::gift_level_stats(
                records,
                GroupDimension::PaymentMethod,
            ),
            donation_type_totals: aggregate::category_totals(records, GroupDimension::DonationType),
            payment_method_totals: aggregate::category_totals(
                records,
                GroupDimension::PaymentMethod,
            ),
            distribution: DistributionSummary::from_buckets(&buckets, settings.value_threshold),
            buckets,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render every section as console tables.
    pub fn render_tables(&self) -> String {
        let mut out = String::new();

        section(&mut out, "Summary", &summary_table(&self.summary, &self.filter));
        section(&mut out, "Monthly Contributions", &monthly_table(&self.monthly));
        section(
            &mut out,
            "Monthly Giving Trends by Year",
            &month_of_year_table(&self.monthly_by_year),
        );
        section(&mut out, "Yearly Totals", &yearly_table(&self.yearly));
        section(
            &mut out,
            &format!("Spikes (mean + {}σ)", self.spike_k),
            &month_value_table(&self.spikes_and_dips.spikes),
        );
        section(
            &mut out,
            &format!("Dips (mean - {}σ)", self.spike_k),
            &month_value_table(&self.spikes_and_dips.dips),
        );
        section(
            &mut out,
            &format!("Top {} Funds by Total Value", self.fund_rankings.top.len()),
            &fund_table(&self.fund_rankings.top),
        );
        section(
            &mut out,
            &format!("Bottom {} Funds by Total Value", self.fund_rankings.bottom.len()),
            &fund_table(&self.fund_rankings.bottom),
        );
        section(
            &mut out,
            "Gifts by Donation Type",
            &gift_stats_table(&self.donation_type_stats),
        );
        section(
            &mut out,
            "Donation Type Distribution",
            &category_table("Donation Type", &self.donation_type_totals),
        );
        section(
            &mut out,
            "Gifts by Payment Method",
            &gift_stats_table(&self.payment_method_stats),
        );
        section(
            &mut out,
            "Payment Method Distribution",
            &category_table("Payment Method", &self.payment_method_totals),
        );
        section(
            &mut out,
            "Distribution of Contribution Amounts",
            &distribution_table(&self.distribution),
        );

        out
    }
}

fn section(out: &mut String, title: &str, table: &Table) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "\n=== {} ===\n{}", title, table);
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

fn money(value: f64) -> Cell {
    Cell::new(format_currency(value)).set_alignment(CellAlignment::Right)
}

fn right(text: impl ToString) -> Cell {
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

fn summary_table(summary: &DatasetSummary, filter: &FilterSummary) -> Table {
    let mut table = new_table(vec!["Field", "Value"]);
    table
        .add_row(vec![Cell::new("Year"), Cell::new(&filter.year)])
        .add_row(vec![Cell::new("Payment Method"), Cell::new(&filter.payment_method)])
        .add_row(vec![Cell::new("Fund"), Cell::new(&filter.fund)])
        .add_row(vec![Cell::new("Donation Type"), Cell::new(&filter.donation_type)])
        .add_row(vec![Cell::new("Rows"), right(summary.records)])
        .add_row(vec![Cell::new("Undated Rows"), right(summary.undated)])
        .add_row(vec![Cell::new("Grand Total"), money(summary.grand_total)]);
    table
}

fn monthly_table(monthly: &[MonthlyTotal]) -> Table {
    let mut table = new_table(vec!["Month", "Total Contributions", "YoY % Change"]);
    for m in monthly {
        table.add_row(vec![
            Cell::new(format_month(m.year_month)),
            money(m.total),
            right(format_percent(m.yoy_pct_change)),
        ]);
    }
    table
}

fn month_of_year_table(rows: &[MonthOfYearTotal]) -> Table {
    let mut table = new_table(vec!["Month", "Year", "Total"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(month_label(row.month)),
            right(row.year),
            money(row.total),
        ]);
    }
    table
}

fn yearly_table(rows: &[YearTotal]) -> Table {
    let mut table = new_table(vec!["Year", "Total"]);
    for row in rows {
        table.add_row(vec![right(row.year), money(row.total)]);
    }
    table
}

fn month_value_table(rows: &[aggregate::MonthValue]) -> Table {
    let mut table = new_table(vec!["Month", "Total"]);
    for row in rows {
        table.add_row(vec![Cell::new(format_month(row.year_month)), money(row.total)]);
    }
    table
}

fn fund_table(funds: &[FundTotal]) -> Table {
    let mut table = new_table(vec!["Fund", "Total"]);
    for fund in funds {
        table.add_row(vec![Cell::new(&fund.name), money(fund.total)]);
    }
    table
}

fn gift_stats_table(stats: &GiftStatsTable) -> Table {
    let mut table = new_table(vec![stats.dimension.label(), "Sum", "Count", "Mean", "StdDev"]);
    for group in &stats.groups {
        table.add_row(vec![
            Cell::new(&group.key),
            money(group.sum),
            right(group.count),
            money(group.mean),
            right(format_optional_currency(group.stddev)),
        ]);
    }
    let subtotal = &stats.subtotal;
    table.add_row(vec![
        Cell::new(SUBTOTAL_LABEL),
        money(subtotal.sum),
        right(subtotal.count),
        right(format_optional_currency(subtotal.mean)),
        right(format_optional_currency(subtotal.stddev)),
    ]);
    table
}

fn category_table(label: &str, totals: &[CategoryTotal]) -> Table {
    let grand: f64 = totals.iter().map(|t| t.total).sum();
    let mut table = new_table(vec![label, "Total", "Share"]);
    for row in totals {
        let share = (grand != 0.0).then(|| row.total / grand * 100.0);
        table.add_row(vec![
            Cell::new(&row.key),
            money(row.total),
            right(format_percent(share)),
        ]);
    }
    table
}

fn distribution_table(dist: &DistributionSummary) -> Table {
    let threshold = format_currency(dist.threshold);
    let mut table = new_table(vec!["Bucket", "Count", "Total"]);
    table
        .add_row(vec![
            Cell::new(format!("Small (<= {})", threshold)),
            right(dist.low_count),
            money(dist.low_total),
        ])
        .add_row(vec![
            Cell::new(format!("Large (> {})", threshold)),
            right(dist.high_count),
            money(dist.high_total),
        ]);
    table
}

/// Render the available filter values, each list led by the "All" sentinel.
pub fn render_filter_options(options: &FilterOptions) -> String {
    fn line<T: ToString>(label: &str, values: &[T]) -> String {
        let mut parts = vec![ALL.to_string()];
        parts.extend(values.iter().map(ToString::to_string));
        format!("{}: {}", label, parts.join(", "))
    }

    [
        line("Year", &options.years),
        line("Payment Method", &options.payment_methods),
        line("Fund", &options.funds),
        line("Donation Type", &options.donation_types),
    ]
    .join("\n")
}

/// Format a dollar amount with thousands separators and two decimals.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

pub fn format_optional_currency(value: Option<f64>) -> String {
    value.map(format_currency).unwrap_or_default()
}

/// `12.34%`, or an empty string when there is nothing to compare against
pub fn format_percent(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}%", v)).unwrap_or_default()
}

pub fn format_month(year_month: NaiveDate) -> String {
    year_month.format("%Y-%m").to_string()
}

pub fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_LABELS.get(idx as usize))
        .copied()
        .unwrap_or("?")
}

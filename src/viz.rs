//! Chart rendering with Plotters
//!
//! Charts are written as SVG so no system fonts are needed. Histogram
//! binning lives here too: it only exists to draw the distribution charts.

use crate::aggregate::{CategoryTotal, FundTotal, MonthOfYearTotal, MonthlyTotal};
use crate::data::DonationRecord;
use crate::report::{format_currency, format_month, month_label, DashboardReport};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default bin counts for the small and large contribution histograms
pub const LOW_BUCKET_BINS: usize = 50;
pub const HIGH_BUCKET_BINS: usize = 30;

/// Label used for records without a donation type
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Color palette for chart series
const SERIES_COLORS: [RGBColor; 7] = [
    BLUE,
    RED,
    GREEN,
    MAGENTA,
    CYAN,
    RGBColor(255, 140, 0),
    BLACK,
];

fn series_color(idx: usize) -> RGBColor {
    SERIES_COLORS[idx % SERIES_COLORS.len()]
}

/// Equal-width bins with one count per donation type
#[derive(Debug, Clone, PartialEq)]
pub struct StackedHistogram {
    /// `bins + 1` edges, ascending
    pub edges: Vec<f64>,
    /// Counts per bin for each donation type, types in name order
    pub series: Vec<(String, Vec<usize>)>,
}

impl StackedHistogram {
    pub fn bin_count(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Combined count of every series per bin
    pub fn totals(&self) -> Vec<usize> {
        let mut totals = vec![0; self.bin_count()];
        for (_, counts) in &self.series {
            for (total, count) in totals.iter_mut().zip(counts) {
                *total += count;
            }
        }
        totals
    }
}

/// Index of the bin holding `value`; the maximum falls in the last bin.
fn bin_index(value: f64, min: f64, width: f64, bins: usize) -> usize {
    (((value - min) / width).floor() as usize).min(bins - 1)
}

/// Bin record values into `bins` equal-width bins spanning min..=max,
/// stacked by donation type. Returns `None` for no records or zero bins.
pub fn bin_values(records: &[&DonationRecord], bins: usize) -> Option<StackedHistogram> {
    if records.is_empty() || bins == 0 {
        return None;
    }

    let min = records
        .iter()
        .map(|r| r.designated_value)
        .fold(f64::INFINITY, f64::min);
    let max = records
        .iter()
        .map(|r| r.designated_value)
        .fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let width = span / bins as f64;

    let edges = (0..=bins).map(|i| min + width * i as f64).collect();

    let mut series: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for record in records {
        let key = record.donation_type.as_deref().unwrap_or(UNKNOWN_TYPE);
        let counts = series.entry(key).or_insert_with(|| vec![0; bins]);
        counts[bin_index(record.designated_value, min, width, bins)] += 1;
    }

    Some(StackedHistogram {
        edges,
        series: series
            .into_iter()
            .map(|(key, counts)| (key.to_string(), counts))
            .collect(),
    })
}

fn value_range(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let min = values.clone().fold(0.0f64, f64::min);
    let max = values.fold(0.0f64, f64::max);
    if max > min {
        (min * 1.1, max * 1.1)
    } else {
        (min, min + 1.0)
    }
}

/// Line chart of monthly totals over time
pub fn create_monthly_trend_chart(
    monthly: &[MonthlyTotal],
    output_path: &Path,
) -> crate::Result<()> {
    let (y_min, y_max) = value_range(monthly.iter().map(|m| m.total));
    let x_max = monthly.len().max(2) as f64 - 1.0;

    let root = SVGBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Monthly Total Contributions Over Time", ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Total Contributions ($)")
        .x_labels(monthly.len().clamp(2, 12))
        .x_label_formatter(&|x| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            monthly
                .get(idx as usize)
                .map(|m| format_month(m.year_month))
                .unwrap_or_default()
        })
        .y_label_formatter(&|y| format_currency(*y))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        monthly.iter().enumerate().map(|(i, m)| (i as f64, m.total)),
        &BLUE,
    ))?;
    chart.draw_series(
        monthly
            .iter()
            .enumerate()
            .map(|(i, m)| Circle::new((i as f64, m.total), 3, BLUE.filled())),
    )?;

    root.present()?;
    debug!("Monthly trend chart saved to: {}", output_path.display());
    Ok(())
}

/// One line per year across calendar months; missing months break the line
pub fn create_monthly_by_year_chart(
    rows: &[MonthOfYearTotal],
    output_path: &Path,
) -> crate::Result<()> {
    let (y_min, y_max) = value_range(rows.iter().map(|r| r.total));

    let mut by_year: BTreeMap<i32, Vec<(u32, f64)>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.year).or_default().push((row.month, row.total));
    }

    let root = SVGBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Monthly Giving Trends", ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(1f64..12f64, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Total Giving ($)")
        .x_labels(12)
        .x_label_formatter(&|x| month_label(x.round() as u32).to_string())
        .y_label_formatter(&|y| format_currency(*y))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (idx, (year, mut points)) in by_year.into_iter().enumerate() {
        points.sort_by_key(|(month, _)| *month);
        let color = series_color(idx);

        // Split into runs of consecutive months
        let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
        let mut last_month: Option<u32> = None;
        for (month, total) in &points {
            if last_month.map_or(true, |prev| prev + 1 != *month) {
                runs.push(Vec::new());
            }
            if let Some(run) = runs.last_mut() {
                run.push((*month as f64, *total));
            }
            last_month = Some(*month);
        }

        for run in runs {
            chart.draw_series(LineSeries::new(run, color.stroke_width(2)))?;
        }
        chart
            .draw_series(
                points
                    .iter()
                    .map(|(m, t)| Circle::new((*m as f64, *t), 4, color.filled())),
            )?
            .label(year.to_string())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    debug!("Monthly-by-year chart saved to: {}", output_path.display());
    Ok(())
}

/// Vertical bar chart with one labelled bar per entry
fn draw_bar_chart(
    labels: &[&str],
    values: &[f64],
    title: &str,
    color: RGBColor,
    output_path: &Path,
) -> crate::Result<()> {
    let (y_min, y_max) = value_range(values.iter().copied());
    let n = labels.len().max(1);

    let root = SVGBackend::new(output_path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).map(|s| s.to_string()).unwrap_or_default()
        })
        .y_label_formatter(&|y| format_currency(*y))
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
        let x = i as f64;
        Rectangle::new([(x - 0.35, 0.0), (x + 0.35, v)], color.filled())
    }))?;

    root.present()?;
    Ok(())
}

pub fn create_fund_chart(
    funds: &[FundTotal],
    title: &str,
    output_path: &Path,
) -> crate::Result<()> {
    let labels: Vec<&str> = funds.iter().map(|f| f.name.as_str()).collect();
    let values: Vec<f64> = funds.iter().map(|f| f.total).collect();
    draw_bar_chart(&labels, &values, title, BLUE, output_path)?;
    debug!("Fund chart saved to: {}", output_path.display());
    Ok(())
}

pub fn create_category_chart(
    totals: &[CategoryTotal],
    title: &str,
    output_path: &Path,
) -> crate::Result<()> {
    let labels: Vec<&str> = totals.iter().map(|t| t.key.as_str()).collect();
    let values: Vec<f64> = totals.iter().map(|t| t.total).collect();
    draw_bar_chart(&labels, &values, title, GREEN, output_path)?;
    debug!("Category chart saved to: {}", output_path.display());
    Ok(())
}

/// Stacked histogram of contribution amounts colored by donation type
pub fn create_distribution_chart(
    records: &[&DonationRecord],
    bins: usize,
    title: &str,
    output_path: &Path,
) -> crate::Result<()> {
    let root = SVGBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let Some(histogram) = bin_values(records, bins) else {
        root.titled(title, ("sans-serif", 26))?;
        root.present()?;
        return Ok(());
    };

    let x_min = histogram.edges[0];
    let x_max = histogram.edges[histogram.bin_count()];
    let y_max = histogram.totals().into_iter().max().unwrap_or(1).max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Contribution Amount ($)")
        .y_desc("Count")
        .x_label_formatter(&|x| format_currency(*x))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let mut stacked = vec![0usize; histogram.bin_count()];
    for (idx, (donation_type, counts)) in histogram.series.iter().enumerate() {
        let color = series_color(idx);
        let bars: Vec<Rectangle<(f64, f64)>> = counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(bin, &count)| {
                let base = stacked[bin] as f64;
                let top = base + count as f64;
                Rectangle::new(
                    [(histogram.edges[bin], base), (histogram.edges[bin + 1], top)],
                    color.filled(),
                )
            })
            .collect();
        for (slot, count) in stacked.iter_mut().zip(counts) {
            *slot += count;
        }

        chart
            .draw_series(bars)?
            .label(donation_type.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    debug!("Distribution chart saved to: {}", output_path.display());
    Ok(())
}

/// Render every dashboard chart into `output_dir`, returning the written paths.
///
/// # Arguments
/// * `report` - Aggregates to draw
/// * `low_bins` - Histogram bins for contributions at or below the threshold
/// * `high_bins` - Histogram bins for contributions above the threshold
/// * `output_dir` - Created if it does not exist
///
/// # Returns
/// The eight SVG files written, in drawing order.
pub fn generate_chart_report(
    report: &DashboardReport<'_>,
    low_bins: usize,
    high_bins: usize,
    output_dir: &Path,
) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let path = |name: &str| output_dir.join(name);
    let threshold = format_currency(report.distribution.threshold);

    // Trends
    let monthly = path("monthly_trend.svg");
    create_monthly_trend_chart(&report.monthly, &monthly)?;

    let by_year = path("monthly_by_year.svg");
    create_monthly_by_year_chart(&report.monthly_by_year, &by_year)?;

    // Fund rankings
    let top = path("top_funds.svg");
    create_fund_chart(
        &report.fund_rankings.top,
        &format!("Top {} Funds by Total Value", report.fund_rankings.top.len()),
        &top,
    )?;

    let bottom = path("bottom_funds.svg");
    create_fund_chart(
        &report.fund_rankings.bottom,
        &format!("Bottom {} Funds by Total Value", report.fund_rankings.bottom.len()),
        &bottom,
    )?;

    // Category shares
    let donation_types = path("donation_types.svg");
    create_category_chart(
        &report.donation_type_totals,
        "Donation Type Distribution",
        &donation_types,
    )?;

    let payment_methods = path("payment_methods.svg");
    create_category_chart(
        &report.payment_method_totals,
        "Payment Method Distribution",
        &payment_methods,
    )?;

    // Contribution size histograms
    let low = path("distribution_small.svg");
    create_distribution_chart(
        &report.buckets.low,
        low_bins,
        &format!("Small Contributions (<= {})", threshold),
        &low,
    )?;

    let high = path("distribution_large.svg");
    create_distribution_chart(
        &report.buckets.high,
        high_bins,
        &format!("Large Contributions (> {})", threshold),
        &high,
    )?;

    let written = vec![
        monthly,
        by_year,
        top,
        bottom,
        donation_types,
        payment_methods,
        low,
        high,
    ];
    info!("Wrote {} charts to {}", written.len(), output_dir.display());
    Ok(written)
}

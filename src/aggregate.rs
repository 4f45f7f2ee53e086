//! Aggregations over a filtered donation record set
//!
//! Every function here is pure: it reads a record slice and returns plain
//! numeric data. Nothing is formatted and nothing fails; an empty input
//! produces empty output.

use crate::data::DonationRecord;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Default number of standard deviations for spike/dip detection
pub const DEFAULT_SPIKE_K: f64 = 1.0;
/// Default size of the top/bottom fund lists
pub const DEFAULT_TOP_N: usize = 5;
/// Default split between small and large contributions
pub const DEFAULT_VALUE_THRESHOLD: f64 = 1000.0;

/// Label of the pseudo-group appended to gift statistics
pub const SUBTOTAL_LABEL: &str = "Subtotal";

/// Total for one calendar month, with change against the same month a year earlier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub year_month: NaiveDate,
    pub total: f64,
    pub yoy_pct_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthValue {
    pub year_month: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpikesAndDips {
    pub spikes: Vec<MonthValue>,
    pub dips: Vec<MonthValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundTotal {
    pub name: String,
    pub total: f64,
}

/// Top funds largest first, bottom funds smallest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FundRankings {
    pub top: Vec<FundTotal>,
    pub bottom: Vec<FundTotal>,
}

/// Category dimension used for gift statistics and category totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimension {
    DonationType,
    PaymentMethod,
}

impl GroupDimension {
    pub fn key<'a>(&self, record: &'a DonationRecord) -> Option<&'a str> {
        match self {
            GroupDimension::DonationType => record.donation_type.as_deref(),
            GroupDimension::PaymentMethod => record.cc_type.as_deref(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupDimension::DonationType => "Donation Type",
            GroupDimension::PaymentMethod => "Payment Method",
        }
    }
}

/// Statistics over gift values of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub sum: f64,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single gift
    pub stddev: Option<f64>,
}

/// Column-wise sum over all groups.
///
/// `mean` and `stddev` are plain sums of the per-group columns, matching
/// the dashboard table layout. They are not statistics of the union.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subtotal {
    pub sum: f64,
    pub count: usize,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GiftStatsTable {
    pub dimension: GroupDimension,
    pub groups: Vec<GroupStats>,
    pub subtotal: Subtotal,
}

/// Records split around a value threshold, non-positive values dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValueBuckets<'a> {
    pub low: Vec<&'a DonationRecord>,
    pub high: Vec<&'a DonationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotal {
    pub year: i32,
    pub total: f64,
}

/// Total for a calendar month (1-12) within one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthOfYearTotal {
    pub month: u32,
    pub year: i32,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub key: String,
    pub total: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Standard deviation with one degree of freedom removed
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Sum values per key. Keys come back in ascending order.
fn group_sum<K, I>(items: I) -> BTreeMap<K, f64>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut sums = BTreeMap::new();
    for (key, value) in items {
        *sums.entry(key).or_insert(0.0) += value;
    }
    sums
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn same_month_prior_year(month: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(month.year() - 1, month.month(), 1)
}

/// Monthly totals in chronological order. Undated records are skipped.
///
/// # Returns
/// One row per month with records. `yoy_pct_change` compares against the
/// same calendar month one year earlier and is `None` when that month is
/// absent or totals zero.
pub fn monthly_totals(records: &[DonationRecord]) -> Vec<MonthlyTotal> {
    let sums = group_sum(
        records
            .iter()
            .filter_map(|r| r.year_month().map(|ym| (ym, r.designated_value))),
    );

    sums.iter()
        .map(|(&year_month, &total)| {
            let yoy_pct_change = same_month_prior_year(year_month)
                .and_then(|prior| sums.get(&prior))
                .filter(|&&prior_total| prior_total != 0.0)
                .map(|&prior_total| (total / prior_total - 1.0) * 100.0);

            MonthlyTotal {
                year_month,
                total,
                yoy_pct_change,
            }
        })
        .collect()
}

/// Months whose total lies strictly outside `mean ± k·σ`, σ being the
/// population standard deviation of all monthly totals.
///
/// # Arguments
/// * `records` - Filtered rows; undated ones are ignored
/// * `k` - Number of standard deviations from the mean
///
/// # Returns
/// Spike and dip months, each in chronological order. A month exactly on a
/// bound is neither.
pub fn spikes_and_dips(records: &[DonationRecord], k: f64) -> SpikesAndDips {
    let monthly = monthly_totals(records);
    let totals: Vec<f64> = monthly.iter().map(|m| m.total).collect();

    let (Some(mu), Some(sigma)) = (mean(&totals), population_std_dev(&totals)) else {
        return SpikesAndDips::default();
    };
    let upper = mu + k * sigma;
    let lower = mu - k * sigma;

    let mut result = SpikesAndDips::default();
    for month in monthly {
        let value = MonthValue {
            year_month: month.year_month,
            total: month.total,
        };
        if month.total > upper {
            result.spikes.push(value);
        } else if month.total < lower {
            result.dips.push(value);
        }
    }
    result
}

/// All funds sorted by total, largest first. Equal totals keep name order.
pub fn fund_totals(records: &[DonationRecord]) -> Vec<FundTotal> {
    let sums = group_sum(records.iter().filter_map(|r| {
        r.designation_name
            .as_deref()
            .map(|name| (name, r.designated_value))
    }));

    let mut funds: Vec<FundTotal> = sums
        .into_iter()
        .map(|(name, total)| FundTotal {
            name: name.to_string(),
            total,
        })
        .collect();
    funds.sort_by(|a, b| descending(a.total, b.total));
    funds
}

/// Top `n` funds (descending) and bottom `n` funds (ascending).
pub fn fund_rankings(records: &[DonationRecord], n: usize) -> FundRankings {
    let ranked = fund_totals(records);

    let top = ranked.iter().take(n).cloned().collect();
    let mut bottom = ranked[ranked.len().saturating_sub(n)..].to_vec();
    bottom.sort_by(|a, b| a.total.partial_cmp(&b.total).unwrap_or(Ordering::Equal));

    FundRankings { top, bottom }
}

/// Gift statistics per category.
///
/// Rows sharing a `contribution_id` and category are first collapsed into
/// one gift, so a gift split over several funds counts once. Rows missing
/// either key are left out.
///
/// # Arguments
/// * `records` - Filtered designation rows
/// * `group_by` - Category column to group gifts by
///
/// # Returns
/// Groups sorted by gift sum, largest first, plus a [`Subtotal`] row whose
/// columns are the sums of the group columns.
pub fn gift_level_stats(records: &[DonationRecord], group_by: GroupDimension) -> GiftStatsTable {
    let gifts = group_sum(records.iter().filter_map(|r| {
        let contribution = r.contribution_id.as_deref()?;
        let key = group_by.key(r)?;
        Some(((key, contribution), r.designated_value))
    }));

    let mut values_by_key: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for ((key, _), gift_value) in gifts {
        values_by_key.entry(key).or_default().push(gift_value);
    }

    let mut groups: Vec<GroupStats> = values_by_key
        .into_iter()
        .map(|(key, values)| GroupStats {
            key: key.to_string(),
            sum: values.iter().sum(),
            count: values.len(),
            mean: mean(&values).unwrap_or_default(),
            stddev: sample_std_dev(&values),
        })
        .collect();
    groups.sort_by(|a, b| descending(a.sum, b.sum));

    let subtotal = Subtotal {
        sum: groups.iter().map(|g| g.sum).sum(),
        count: groups.iter().map(|g| g.count).sum(),
        mean: (!groups.is_empty()).then(|| groups.iter().map(|g| g.mean).sum()),
        // Single-gift groups have no stddev and add nothing
        stddev: (!groups.is_empty()).then(|| groups.iter().filter_map(|g| g.stddev).sum()),
    };

    GiftStatsTable {
        dimension: group_by,
        groups,
        subtotal,
    }
}

/// Split positive contributions at `threshold`, inclusive on the low side.
pub fn value_distribution_buckets(
    records: &[DonationRecord],
    threshold: f64,
) -> ValueBuckets<'_> {
    let (low, high) = records
        .iter()
        .filter(|r| r.designated_value > 0.0)
        .partition(|r| r.designated_value <= threshold);
    ValueBuckets { low, high }
}

pub fn yearly_totals(records: &[DonationRecord]) -> Vec<YearTotal> {
    group_sum(
        records
            .iter()
            .filter_map(|r| r.year().map(|y| (y, r.designated_value))),
    )
    .into_iter()
    .map(|(year, total)| YearTotal { year, total })
    .collect()
}

/// Totals keyed by (calendar month, year), ordered by month then year.
/// Combinations without records are absent.
pub fn monthly_totals_by_year(records: &[DonationRecord]) -> Vec<MonthOfYearTotal> {
    group_sum(records.iter().filter_map(|r| {
        r.year_month()
            .map(|ym| ((ym.month(), ym.year()), r.designated_value))
    }))
    .into_iter()
    .map(|((month, year), total)| MonthOfYearTotal { month, year, total })
    .collect()
}

/// Sum of values per category, largest first.
pub fn category_totals(
    records: &[DonationRecord],
    dimension: GroupDimension,
) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = group_sum(
        records
            .iter()
            .filter_map(|r| dimension.key(r).map(|k| (k, r.designated_value))),
    )
    .into_iter()
    .map(|(key, total)| CategoryTotal {
        key: key.to_string(),
        total,
    })
    .collect();
    totals.sort_by(|a, b| descending(a.total, b.total));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_timestamp;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn at(date: &str, value: f64) -> DonationRecord {
        DonationRecord::new(parse_timestamp(date), value)
    }

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn fund(name: &str, value: f64) -> DonationRecord {
        DonationRecord::new(None, value).with_fund(name, name)
    }

    fn gift(contribution: &str, donation_type: &str, value: f64) -> DonationRecord {
        DonationRecord::new(None, value)
            .with_contribution_id(contribution)
            .with_donation_type(donation_type)
    }

    fn names(funds: &[FundTotal]) -> Vec<&str> {
        funds.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_monthly_totals_groups_and_orders() {
        let records = vec![
            at("2023-03-10", 30.0),
            at("2023-01-05", 10.0),
            at("2023-01-25", 15.0),
            DonationRecord::new(None, 999.0),
            at("2022-12-31", 5.0),
        ];

        let monthly = monthly_totals(&records);
        let keys: Vec<NaiveDate> = monthly.iter().map(|m| m.year_month).collect();
        assert_eq!(keys, vec![month(2022, 12), month(2023, 1), month(2023, 3)]);
        assert_eq!(monthly[1].total, 25.0);
        assert!(monthly.iter().all(|m| m.yoy_pct_change.is_none()));
    }

    #[test]
    fn test_yoy_uses_calendar_month_one_year_back() {
        let mut records = Vec::new();
        for m in 1..=12 {
            records.push(at(&format!("2022-{:02}-15", m), 100.0));
        }
        records.push(at("2023-01-15", 150.0));
        // February 2023 is missing; March still compares against March 2022
        records.push(at("2023-03-15", 50.0));

        let monthly = monthly_totals(&records);
        assert_eq!(monthly.len(), 14);
        assert!(monthly[..12].iter().all(|m| m.yoy_pct_change.is_none()));

        let jan = &monthly[12];
        assert_eq!(jan.year_month, month(2023, 1));
        assert!((jan.yoy_pct_change.unwrap() - 50.0).abs() < 1e-9);

        let mar = &monthly[13];
        assert_eq!(mar.year_month, month(2023, 3));
        assert!((mar.yoy_pct_change.unwrap() + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_yoy_absent_when_prior_year_month_missing_or_zero() {
        let records = vec![
            at("2022-02-01", 0.0),
            at("2023-02-01", 40.0),
            at("2023-04-01", 40.0),
        ];
        let monthly = monthly_totals(&records);
        assert!(monthly.iter().all(|m| m.yoy_pct_change.is_none()));
    }

    #[test]
    fn test_spikes_and_dips_are_strict() {
        let records = vec![
            at("2023-01-01", 100.0),
            at("2023-02-01", 100.0),
            at("2023-03-01", 100.0),
            at("2023-04-01", 1000.0),
        ];

        let result = spikes_and_dips(&records, DEFAULT_SPIKE_K);
        assert_eq!(
            result.spikes,
            vec![MonthValue {
                year_month: month(2023, 4),
                total: 1000.0
            }]
        );
        assert!(result.dips.is_empty());
    }

    #[test]
    fn test_month_exactly_one_sigma_away_is_not_flagged() {
        // mean 1, population sigma 1: both months sit on the bounds
        let records = vec![at("2023-01-01", 0.0), at("2023-02-01", 2.0)];

        let result = spikes_and_dips(&records, 1.0);
        assert!(result.spikes.is_empty());
        assert!(result.dips.is_empty());
    }

    #[test]
    fn test_spikes_and_dips_both_sides() {
        let records = vec![
            at("2023-01-01", 10.0),
            at("2023-02-01", 100.0),
            at("2023-03-01", 100.0),
            at("2023-04-01", 100.0),
            at("2023-05-01", 190.0),
        ];

        let result = spikes_and_dips(&records, 1.0);
        assert_eq!(result.spikes.len(), 1);
        assert_eq!(result.spikes[0].year_month, month(2023, 5));
        assert_eq!(result.dips.len(), 1);
        assert_eq!(result.dips[0].year_month, month(2023, 1));
    }

    #[test]
    fn test_flat_series_has_no_spikes() {
        let records = vec![at("2023-01-01", 50.0), at("2023-02-01", 50.0)];
        assert_eq!(spikes_and_dips(&records, 1.0), SpikesAndDips::default());
        assert_eq!(spikes_and_dips(&[], 1.0), SpikesAndDips::default());
    }

    #[test]
    fn test_fund_rankings_order() {
        let records = vec![
            fund("A", 500.0),
            fund("B", 100.0),
            fund("C", 300.0),
            fund("D", 50.0),
            fund("E", 10.0),
        ];

        let rankings = fund_rankings(&records, 5);
        assert_eq!(names(&rankings.top), vec!["A", "C", "B", "D", "E"]);
        assert_eq!(names(&rankings.bottom), vec!["E", "D", "B", "C", "A"]);
    }

    #[test]
    fn test_fund_rankings_smaller_than_n_and_ties() {
        let records = vec![
            fund("Zeta", 20.0),
            fund("Alpha", 20.0),
            fund("Mid", 5.0),
            fund("Mid", 10.0),
            DonationRecord::new(None, 1000.0),
        ];

        let rankings = fund_rankings(&records, 2);
        assert_eq!(names(&rankings.top), vec!["Alpha", "Zeta"]);
        assert_eq!(names(&rankings.bottom), vec!["Mid", "Zeta"]);
        assert_eq!(rankings.bottom[0].total, 15.0);

        let all = fund_rankings(&records, 10);
        assert_eq!(all.top.len(), 3);
        assert_eq!(all.bottom.len(), 3);

        assert_eq!(fund_rankings(&[], 5), FundRankings::default());
    }

    #[test]
    fn test_gift_collapse_counts_split_gift_once() {
        let records = vec![
            gift("C1", "Online", 30.0).with_fund("1", "Athletics"),
            gift("C1", "Online", 20.0).with_fund("2", "Library"),
        ];

        let table = gift_level_stats(&records, GroupDimension::DonationType);
        assert_eq!(
            table.groups,
            vec![GroupStats {
                key: "Online".to_string(),
                sum: 50.0,
                count: 1,
                mean: 50.0,
                stddev: None,
            }]
        );
    }

    #[test]
    fn test_gift_stats_sorted_with_subtotal() {
        let records = vec![
            gift("C1", "Online", 10.0),
            gift("C2", "Online", 30.0),
            gift("C3", "Matching", 500.0),
            gift("C4", "Pledge", 2.0),
            gift("C5", "Pledge", 4.0),
            gift("C6", "Pledge", 6.0),
            // dropped: no contribution id / no type
            DonationRecord::new(None, 77.0).with_donation_type("Online"),
            DonationRecord::new(None, 88.0).with_contribution_id("C7"),
        ];

        let table = gift_level_stats(&records, GroupDimension::DonationType);
        let keys: Vec<&str> = table.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Matching", "Online", "Pledge"]);

        let online = &table.groups[1];
        assert_eq!(online.count, 2);
        assert_eq!(online.mean, 20.0);
        assert!((online.stddev.unwrap() - 200f64.sqrt()).abs() < 1e-9);

        let pledge = &table.groups[2];
        assert!((pledge.stddev.unwrap() - 2.0).abs() < 1e-9);

        let subtotal = &table.subtotal;
        assert_eq!(subtotal.sum, table.groups.iter().map(|g| g.sum).sum::<f64>());
        assert_eq!(subtotal.count, 6);
        assert_eq!(subtotal.mean, Some(500.0 + 20.0 + 4.0));
        assert!((subtotal.stddev.unwrap() - (200f64.sqrt() + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_gift_stats_by_payment_method() {
        let records = vec![
            DonationRecord::new(None, 10.0).with_contribution_id("C1").with_cc_type("Visa"),
            DonationRecord::new(None, 15.0).with_contribution_id("C1").with_cc_type("Visa"),
            DonationRecord::new(None, 40.0).with_contribution_id("C2").with_cc_type("Amex"),
        ];

        let table = gift_level_stats(&records, GroupDimension::PaymentMethod);
        assert_eq!(table.dimension, GroupDimension::PaymentMethod);
        assert_eq!(table.groups[0].key, "Amex");
        assert_eq!(table.groups[1].key, "Visa");
        assert_eq!(table.groups[1].sum, 25.0);
        assert_eq!(table.groups[1].count, 1);
    }

    #[test]
    fn test_subtotal_stddev_is_zero_for_single_gift_groups() {
        let records = vec![gift("C1", "Online", 10.0), gift("C2", "Pledge", 20.0)];

        let table = gift_level_stats(&records, GroupDimension::DonationType);
        assert!(table.groups.iter().all(|g| g.stddev.is_none()));
        assert_eq!(
            table.subtotal,
            Subtotal {
                sum: 30.0,
                count: 2,
                mean: Some(30.0),
                stddev: Some(0.0),
            }
        );
    }

    #[test]
    fn test_gift_stats_empty_input() {
        let table = gift_level_stats(&[], GroupDimension::DonationType);
        assert!(table.groups.is_empty());
        assert_eq!(
            table.subtotal,
            Subtotal {
                sum: 0.0,
                count: 0,
                mean: None,
                stddev: None,
            }
        );
    }

    #[test]
    fn test_value_buckets_partition() {
        let records = vec![
            DonationRecord::new(None, 0.0),
            DonationRecord::new(None, -5.0),
            DonationRecord::new(None, 1.0),
            DonationRecord::new(None, 1000.0),
            DonationRecord::new(None, 1000.01),
        ];

        let buckets = value_distribution_buckets(&records, DEFAULT_VALUE_THRESHOLD);
        let low: Vec<f64> = buckets.low.iter().map(|r| r.designated_value).collect();
        let high: Vec<f64> = buckets.high.iter().map(|r| r.designated_value).collect();
        assert_eq!(low, vec![1.0, 1000.0]);
        assert_eq!(high, vec![1000.01]);
    }

    #[test]
    fn test_yearly_and_month_of_year_totals() {
        let records = vec![
            at("2022-02-01", 10.0),
            at("2023-02-10", 20.0),
            at("2023-02-20", 5.0),
            at("2023-01-01", 1.0),
            DonationRecord::new(None, 100.0),
        ];

        let yearly = yearly_totals(&records);
        assert_eq!(
            yearly,
            vec![
                YearTotal { year: 2022, total: 10.0 },
                YearTotal { year: 2023, total: 26.0 },
            ]
        );

        let by_year = monthly_totals_by_year(&records);
        assert_eq!(
            by_year,
            vec![
                MonthOfYearTotal { month: 1, year: 2023, total: 1.0 },
                MonthOfYearTotal { month: 2, year: 2022, total: 10.0 },
                MonthOfYearTotal { month: 2, year: 2023, total: 25.0 },
            ]
        );
    }

    #[test]
    fn test_category_totals_descending() {
        let records = vec![
            DonationRecord::new(None, 5.0).with_cc_type("Visa"),
            DonationRecord::new(None, 50.0).with_cc_type("Amex"),
            DonationRecord::new(None, 10.0).with_cc_type("Visa"),
            DonationRecord::new(None, 1.0),
        ];

        let totals = category_totals(&records, GroupDimension::PaymentMethod);
        assert_eq!(
            totals,
            vec![
                CategoryTotal { key: "Amex".to_string(), total: 50.0 },
                CategoryTotal { key: "Visa".to_string(), total: 15.0 },
            ]
        );
    }

    #[test]
    fn test_stat_helpers() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(population_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(2.0));
        assert_eq!(sample_std_dev(&[3.0]), None);
        assert_eq!(sample_std_dev(&[1.0, 3.0]), Some(2f64.sqrt()));
    }

    fn arb_records() -> impl Strategy<Value = Vec<DonationRecord>> {
        prop::collection::vec(
            (
                prop::option::of((2019i32..2025, 1u32..=12, 1u32..=28)),
                -500i32..5000,
            ),
            0..60,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(date, cents)| {
                    let ts = date.and_then(|(y, m, d)| {
                        NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(12, 0, 0))
                    });
                    DonationRecord::new(ts, cents as f64 / 4.0)
                })
                .collect()
        })
    }

    proptest! {
        /// Monthly and yearly totals conserve the value of all dated records.
        #[test]
        fn totals_conserve_value(records in arb_records()) {
            let dated: f64 = records
                .iter()
                .filter(|r| r.year_month().is_some())
                .map(|r| r.designated_value)
                .sum();
            let monthly: f64 = monthly_totals(&records).iter().map(|m| m.total).sum();
            let yearly: f64 = yearly_totals(&records).iter().map(|y| y.total).sum();
            prop_assert!((monthly - dated).abs() < 1e-6);
            prop_assert!((yearly - dated).abs() < 1e-6);
        }

        /// Months come out strictly increasing.
        #[test]
        fn monthly_keys_strictly_increase(records in arb_records()) {
            let monthly = monthly_totals(&records);
            prop_assert!(monthly.windows(2).all(|w| w[0].year_month < w[1].year_month));
        }

        /// Every positive record lands in exactly one bucket.
        #[test]
        fn buckets_partition_positive_records(
            records in arb_records(),
            threshold in 0.0f64..1500.0,
        ) {
            let buckets = value_distribution_buckets(&records, threshold);
            let positive = records.iter().filter(|r| r.designated_value > 0.0).count();
            prop_assert_eq!(buckets.low.len() + buckets.high.len(), positive);
            prop_assert!(buckets.low.iter().all(|r| r.designated_value <= threshold));
            prop_assert!(buckets.high.iter().all(|r| r.designated_value > threshold));
        }
    }
}

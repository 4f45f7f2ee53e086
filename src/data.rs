//! Donation records, CSV loading and filter selection

use crate::error::{DataError, DataResult};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Columns every input file must carry (after header normalization)
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "created_at",
    "donation_type",
    "cc_type",
    "designation_id",
    "designated_value",
    "designation_name",
    "contribution_id",
];

/// Sentinel accepted by [`Selection`] meaning "no constraint"
pub const ALL: &str = "All";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// One designation row of the input dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationRecord {
    created_at: Option<NaiveDateTime>,
    year: Option<i32>,
    year_month: Option<NaiveDate>,
    pub donation_type: Option<String>,
    pub cc_type: Option<String>,
    pub designation_id: Option<String>,
    pub designation_name: Option<String>,
    pub designated_value: f64,
    pub contribution_id: Option<String>,
}

impl DonationRecord {
    /// Create a record and derive `year` / `year_month` from `created_at`.
    pub fn new(created_at: Option<NaiveDateTime>, designated_value: f64) -> Self {
        let year = created_at.map(|ts| ts.year());
        let year_month =
            created_at.and_then(|ts| NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1));

        Self {
            created_at,
            year,
            year_month,
            donation_type: None,
            cc_type: None,
            designation_id: None,
            designation_name: None,
            designated_value,
            contribution_id: None,
        }
    }

    pub fn with_donation_type(mut self, donation_type: impl Into<String>) -> Self {
        self.donation_type = Some(donation_type.into());
        self
    }

    pub fn with_cc_type(mut self, cc_type: impl Into<String>) -> Self {
        self.cc_type = Some(cc_type.into());
        self
    }

    pub fn with_fund(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.designation_id = Some(id.into());
        self.designation_name = Some(name.into());
        self
    }

    pub fn with_contribution_id(mut self, contribution_id: impl Into<String>) -> Self {
        self.contribution_id = Some(contribution_id.into());
        self
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// First day of the month of `created_at`
    pub fn year_month(&self) -> Option<NaiveDate> {
        self.year_month
    }
}

/// Raw CSV row before normalization. Every cell is optional text.
#[derive(Debug, Deserialize)]
struct RawRow {
    created_at: Option<String>,
    donation_type: Option<String>,
    cc_type: Option<String>,
    designation_id: Option<String>,
    designated_value: Option<String>,
    designation_name: Option<String>,
    contribution_id: Option<String>,
}

impl RawRow {
    /// `Ok(None)` for a row without a value
    fn into_record(self, row: usize) -> DataResult<Option<DonationRecord>> {
        let Some(designated_value) = parse_value(self.designated_value.as_deref(), row)? else {
            return Ok(None);
        };

        let created_at = self.created_at.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                debug!("Row {}: unparseable created_at {:?}, treating as undated", row, raw);
            }
            parsed
        });

        let mut record = DonationRecord::new(created_at, designated_value);
        record.donation_type = clean_text(self.donation_type);
        record.cc_type = clean_text(self.cc_type);
        record.designation_id = clean_text(self.designation_id);
        record.designation_name = clean_text(self.designation_name);
        record.contribution_id = clean_text(self.contribution_id);
        Ok(Some(record))
    }
}

fn clean_text(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse a `designated_value` cell. A blank cell is a missing value;
/// any other text that is not a finite number is a [`DataError::DataFormat`].
fn parse_value(raw: Option<&str>, row: usize) -> DataResult<Option<f64>> {
    let text = raw.unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(None);
    }
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(DataError::DataFormat {
            row,
            value: text.to_string(),
        }),
    }
}

/// Parse a `created_at` cell, returning `None` when no known layout matches.
///
/// RFC 3339 timestamps keep their wall-clock time so that month
/// boundaries follow the offset the data was recorded in.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Map a source header onto its canonical column name.
fn canonical_header(header: &str) -> String {
    let lowered = header.trim().to_ascii_lowercase();
    match lowered.as_str() {
        // Misspelling carried by older exports
        "desination_name" => "designation_name".to_string(),
        _ => lowered,
    }
}

/// Load donation records from a CSV file.
///
/// # Arguments
/// * `path` - Path to a CSV export with the [`REQUIRED_COLUMNS`]
///
/// # Returns
/// Records in file order. Rows with a blank `designated_value` are skipped.
///
/// # Errors
/// [`DataError::Io`] when the file cannot be opened, plus everything
/// [`load_donations_from_reader`] reports.
pub fn load_donations(path: impl AsRef<Path>) -> DataResult<Vec<DonationRecord>> {
    let path = path.as_ref();
    info!("Loading donations from {}", path.display());
    let file = std::fs::File::open(path)?;
    load_donations_from_reader(file)
}

/// Load donation records from any CSV source with a header row.
///
/// Headers are matched case-insensitively. A value cell that holds text
/// other than a finite number aborts the whole load.
///
/// # Errors
/// * [`DataError::MissingColumn`] when a required column is absent
/// * [`DataError::DataFormat`] for a non-numeric `designated_value`
/// * [`DataError::Csv`] for malformed CSV
pub fn load_donations_from_reader<R: Read>(reader: R) -> DataResult<Vec<DonationRecord>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: StringRecord = rdr.headers()?.iter().map(canonical_header).collect();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(DataError::MissingColumn(*missing));
    }
    rdr.set_headers(headers);

    let mut records = Vec::new();
    let mut skipped = 0;
    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        let row: RawRow = result?;
        match row.into_record(idx + 1)? {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} rows with a blank designated_value", skipped);
    }
    let undated = records.iter().filter(|r| r.created_at.is_none()).count();
    info!("Loaded {} donation rows ({} undated)", records.len(), undated);
    Ok(records)
}

/// A per-dimension filter value: either no constraint or one exact value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    /// `All` accepts everything including nulls; `Only` rejects nulls.
    pub fn matches(&self, value: Option<&T>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => value == Some(wanted),
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL) {
            Ok(Selection::All)
        } else {
            s.parse().map(Selection::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str(ALL),
            Selection::Only(value) => write!(f, "{}", value),
        }
    }
}

/// Equality constraints on the four filterable dimensions, combined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub year: Selection<i32>,
    pub payment_method: Selection<String>,
    pub fund: Selection<String>,
    pub donation_type: Selection<String>,
}

impl Filter {
    pub fn matches(&self, record: &DonationRecord) -> bool {
        self.year.matches(record.year.as_ref())
            && self.payment_method.matches(record.cc_type.as_ref())
            && self.fund.matches(record.designation_name.as_ref())
            && self.donation_type.matches(record.donation_type.as_ref())
    }

    pub fn apply(&self, records: &[DonationRecord]) -> Vec<DonationRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == Filter::default()
    }
}

/// Distinct non-null values available for each filter dimension, sorted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub payment_methods: Vec<String>,
    pub funds: Vec<String>,
    pub donation_types: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[DonationRecord]) -> Self {
        fn distinct<T: Ord + Clone>(values: impl Iterator<Item = Option<T>>) -> Vec<T> {
            values.flatten().collect::<BTreeSet<_>>().into_iter().collect()
        }

        Self {
            years: distinct(records.iter().map(|r| r.year)),
            payment_methods: distinct(records.iter().map(|r| r.cc_type.clone())),
            funds: distinct(records.iter().map(|r| r.designation_name.clone())),
            donation_types: distinct(records.iter().map(|r| r.donation_type.clone())),
        }
    }
}

/// Overview of a record set, logged after load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub dated: usize,
    pub undated: usize,
    pub grand_total: f64,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
}

impl DatasetSummary {
    pub fn from_records(records: &[DonationRecord]) -> Self {
        let dates = || records.iter().filter_map(|r| r.created_at);
        let dated = dates().count();

        Self {
            records: records.len(),
            dated,
            undated: records.len() - dated,
            grand_total: records.iter().map(|r| r.designated_value).sum(),
            earliest: dates().min(),
            latest: dates().max(),
        }
    }
}

/// Caller-owned, immutable handle on a loaded dataset.
///
/// The records never change after load; [`Dataset::refresh`] replaces
/// them wholesale by re-reading the source.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    records: Vec<DonationRecord>,
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let records = load_donations(path)?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            records,
        })
    }

    /// Wrap records that were produced elsewhere; such a dataset has no
    /// source to refresh from.
    pub fn from_records(records: Vec<DonationRecord>) -> Self {
        Self {
            source: None,
            records,
        }
    }

    /// Re-read the source file. Returns the new record count.
    pub fn refresh(&mut self) -> DataResult<usize> {
        if let Some(path) = &self.source {
            self.records = load_donations(path)?;
            debug!("Refreshed dataset from {}", path.display());
        }
        Ok(self.records.len())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn records(&self) -> &[DonationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filter(&self, filter: &Filter) -> Vec<DonationRecord> {
        filter.apply(&self.records)
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions::from_records(&self.records)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_records(&self.records)
    }
}

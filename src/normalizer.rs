use crate::error::{Rejection, Result};
use crate::models::{OrderingMode, Record};
use chrono::NaiveDate;
use csv::{ByteRecord, ReaderBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

// Column positions in the pipe-delimited contribution file
const CMTE_ID: usize = 0;
const NAME: usize = 7;
const ZIP_CODE: usize = 10;
const TRANSACTION_DT: usize = 13;
const TRANSACTION_AMT: usize = 14;
const OTHER_ID: usize = 15;

static ZIP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{5,}$").expect("valid zip pattern"));
// Zero-padded MMDDYYYY only; unpadded 7-digit dates like 1312017 are dropped
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{8}$").expect("valid date pattern"));

/// Counters for one pass over the raw input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines_read: usize,
    pub accepted: usize,
    pub rejected: BTreeMap<Rejection, usize>,
}

impl IngestStats {
    /// Rows dropped for any reason.
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Letters only once commas and spaces are removed; the name itself is kept as given.
pub fn is_valid_name(name: &str) -> bool {
    let mut letters = name.chars().filter(|c| *c != ',' && *c != ' ').peekable();
    letters.peek().is_some() && letters.all(char::is_alphabetic)
}

/// Numeric and at least 5 digits long; only the first 5 are kept.
pub fn is_valid_zip(zip: &str) -> bool {
    ZIP_REGEX.is_match(zip)
}

/// Parses an `MMDDYYYY` transaction date.
pub fn parse_transaction_date(date: &str) -> Option<NaiveDate> {
    if !DATE_REGEX.is_match(date) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%m%d%Y").ok()
}

/// Turn one raw row into a [`Record`], or report the first check it fails.
pub fn normalize_fields(fields: &ByteRecord) -> std::result::Result<Record, Rejection> {
    if fields.len() <= OTHER_ID {
        return Err(Rejection::ShortRow);
    }
    // Only the columns we read must be UTF-8; memo text and the like are never decoded
    let decode = |index: usize| {
        std::str::from_utf8(fields.get(index).unwrap_or_default()).map_err(|_| Rejection::InvalidEncoding)
    };
    let recipient_id = decode(CMTE_ID)?;
    let donor_name = decode(NAME)?;
    let zip = decode(ZIP_CODE)?;
    let raw_date = decode(TRANSACTION_DT)?;
    let raw_amount = decode(TRANSACTION_AMT)?;
    let other_id = decode(OTHER_ID)?;

    if recipient_id.is_empty() {
        return Err(Rejection::MissingRecipient);
    }

    if !is_valid_name(donor_name) {
        return Err(Rejection::InvalidName);
    }

    if !is_valid_zip(zip) {
        return Err(Rejection::InvalidZip);
    }

    let date = parse_transaction_date(raw_date).ok_or(Rejection::InvalidDate)?;

    let amount = raw_amount
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|amount| *amount > 0)
        .ok_or(Rejection::InvalidAmount)?;

    if !other_id.is_empty() {
        return Err(Rejection::NotIndividual);
    }

    Ok(Record {
        recipient_id: recipient_id.to_string(),
        donor_name: donor_name.to_string(),
        zip5: zip[..5].to_string(),
        election_year: raw_date[4..].to_string(),
        amount,
        transaction_date: date.format("%Y%m%d").to_string(),
    })
}

/// Read every raw row from `reader`, keeping the ones that normalize, in arrival order.
pub fn normalize_reader<R: Read>(reader: R) -> Result<(Vec<Record>, IngestStats)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut stats = IngestStats::default();

    for (line, row) in (1..).zip(rdr.byte_records()) {
        let row = row?;
        stats.lines_read += 1;
        match normalize_fields(&row) {
            Ok(record) => {
                stats.accepted += 1;
                records.push(record);
            }
            Err(reason) => {
                debug!(line, %reason, "dropping record");
                *stats.rejected.entry(reason).or_insert(0) += 1;
            }
        }
    }

    Ok((records, stats))
}

/// Open `path` and normalize it, logging how many rows survived.
pub fn read_records(path: impl AsRef<Path>) -> Result<(Vec<Record>, IngestStats)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let (records, stats) = normalize_reader(file)?;
    info!(
        path = %path.display(),
        lines = stats.lines_read,
        accepted = stats.accepted,
        rejected = stats.rejected_total(),
        "loaded contribution records"
    );
    Ok((records, stats))
}

/// Stable sort: records that compare equal keep their arrival order.
pub fn order_records(mut records: Vec<Record>, mode: OrderingMode) -> Vec<Record> {
    match mode {
        OrderingMode::ElectionYear => records.sort_by(|a, b| a.election_year.cmp(&b.election_year)),
        OrderingMode::TransactionDate => {
            records.sort_by(|a, b| a.transaction_date.cmp(&b.transaction_date))
        }
    }
    records
}

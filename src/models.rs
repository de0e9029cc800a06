use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ordering: OrderingMode,
    pub percentile_policy: PercentilePolicy,
    // Passed to tracing's EnvFilter when RUST_LOG is unset
    pub log_filter: String,
}

/// Order in which normalized records are fed to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderingMode {
    /// Stable sort on the 4-digit election year only.
    #[default]
    #[serde(rename = "election-year")]
    ElectionYear,
    /// Stable sort on the full transaction date.
    #[serde(rename = "transaction-date")]
    TransactionDate,
}

/// What to do when `floor(n * p / 100)` lands one past the last amount (p = 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PercentilePolicy {
    #[default]
    #[serde(rename = "clamp")]
    Clamp,
    #[serde(rename = "reject")]
    Reject,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ordering: OrderingMode::default(),
            percentile_policy: PercentilePolicy::default(),
            log_filter: "donation_analytics=info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// Requested percentile, guaranteed to be within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percentile(u8);

impl Percentile {
    pub fn new(value: i64) -> Result<Self> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(AnalyticsError::PercentileOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Nearest-rank index into an ascending collection of `len` amounts.
    pub fn rank_index(self, len: usize) -> usize {
        len * self.0 as usize / 100
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated contribution, as handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub recipient_id: String,
    pub donor_name: String,
    pub zip5: String,
    pub election_year: String,
    pub amount: u64,
    /// `YYYYMMDD`, only used by [`OrderingMode::TransactionDate`].
    pub transaction_date: String,
}

impl Record {
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey {
            recipient_id: self.recipient_id.clone(),
            zip5: self.zip5.clone(),
            election_year: self.election_year.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub recipient_id: String,
    pub zip5: String,
    pub election_year: String,
}

/// One emitted line: fields serialize in output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub recipient_id: String,
    pub zip5: String,
    pub election_year: String,
    pub percentile_amount: u64,
    pub running_total: u64,
    pub running_count: usize,
}

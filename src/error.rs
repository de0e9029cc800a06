use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization failed: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("percentile source is empty")]
    MissingPercentile,

    #[error("percentile is not an integer: {0:?}")]
    InvalidPercentile(String),

    #[error("percentile {0} is outside 0..=100")]
    PercentileOutOfRange(i64),

    #[error("percentile index {index} is past the end of a bucket holding {len} amounts")]
    RankOutOfRange { index: usize, len: usize },

    #[error("running total overflowed adding {amount} to {total}")]
    TotalOverflow { total: u64, amount: u64 },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Why a raw line never reached the aggregator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rejection {
    #[error("row has too few fields")]
    ShortRow,
    #[error("a validated column is not valid UTF-8")]
    InvalidEncoding,
    #[error("recipient id is empty")]
    MissingRecipient,
    #[error("donor name is not alphabetic")]
    InvalidName,
    #[error("zip code is not a numeric code of at least 5 digits")]
    InvalidZip,
    #[error("transaction date is not MMDDYYYY")]
    InvalidDate,
    #[error("amount is not a positive integer")]
    InvalidAmount,
    #[error("other id is set, not an individual contribution")]
    NotIndividual,
}

pub mod analyzer;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod report;

use analyzer::RepeatDonorAggregator;
use models::Config;
use normalizer::IngestStats;
use report::ResultWriter;
use std::path::Path;
use tracing::info;

pub use error::{AnalyticsError, Rejection, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ingest: IngestStats,
    pub rows_emitted: usize,
    pub donors: usize,
    pub buckets: usize,
}

/// Normalize `input`, order it, and write one line to `output` per repeat contribution.
///
/// Both inputs are read before `output` is touched, so a failed read leaves
/// any previous output in place.
pub fn run_pipeline(
    input: impl AsRef<Path>,
    percentile_source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &Config,
) -> Result<RunSummary> {
    let (records, ingest) = normalizer::read_records(input)?;
    let percentile = report::read_percentile(percentile_source)?;
    let records = normalizer::order_records(records, config.ordering);

    info!(%percentile, ordering = ?config.ordering, policy = ?config.percentile_policy, "aggregating");

    let mut writer = ResultWriter::create(output)?;
    let mut aggregator = RepeatDonorAggregator::new(percentile, config.percentile_policy);
    let rows_emitted = aggregator.run(&records, |row| writer.write_row(row))?;
    writer.finish()?;

    Ok(RunSummary {
        ingest,
        rows_emitted,
        donors: aggregator.donor_count(),
        buckets: aggregator.bucket_count(),
    })
}

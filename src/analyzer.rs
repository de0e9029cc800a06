use crate::error::{AnalyticsError, Result};
use crate::models::{BucketKey, Percentile, PercentilePolicy, Record, ResultRow};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Repeat-donor amounts for one (recipient, zip, election year).
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    ranked: Vec<u64>, // ascending
    total: u64,
}

impl Bucket {
    /// Append one amount. Fails without changing the bucket if the total would overflow.
    pub fn push(&mut self, amount: u64) -> Result<()> {
        self.total = self
            .total
            .checked_add(amount)
            .ok_or(AnalyticsError::TotalOverflow { total: self.total, amount })?;
        // Inserting after equal amounts keeps `ranked` identical to a fresh sort
        let position = self.ranked.partition_point(|&existing| existing <= amount);
        self.ranked.insert(position, amount);
        Ok(())
    }

    /// Amounts received so far.
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Sum of every amount received so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Current contents, ascending.
    pub fn ranked(&self) -> &[u64] {
        &self.ranked
    }

    /// Nearest-rank percentile over the current contents, no interpolation.
    pub fn percentile_amount(&self, percentile: Percentile, policy: PercentilePolicy) -> Result<u64> {
        let len = self.ranked.len();
        let index = percentile.rank_index(len);
        let index = match policy {
            PercentilePolicy::Clamp => index.min(len.saturating_sub(1)),
            PercentilePolicy::Reject => index,
        };

        self.ranked
            .get(index)
            .copied()
            .ok_or(AnalyticsError::RankOutOfRange { index, len })
    }
}

/// Streaming state for one run: donors seen so far and every bucket opened.
pub struct RepeatDonorAggregator {
    percentile: Percentile,
    policy: PercentilePolicy,
    seen_donors: HashSet<String>,
    buckets: HashMap<BucketKey, Bucket>,
}

impl RepeatDonorAggregator {
    /// Empty state: no donor seen, no bucket opened.
    pub fn new(percentile: Percentile, policy: PercentilePolicy) -> Self {
        Self {
            percentile,
            policy,
            seen_donors: HashSet::new(),
            buckets: HashMap::new(),
        }
    }

    /// Feed one record. Returns a row only when the donor was already seen.
    pub fn process(&mut self, record: &Record) -> Result<Option<ResultRow>> {
        if !self.seen_donors.contains(&record.donor_name) {
            trace!(donor = %record.donor_name, "first contribution from donor");
            self.seen_donors.insert(record.donor_name.clone());
            return Ok(None);
        }

        let bucket = self.buckets.entry(record.bucket_key()).or_default();
        bucket.push(record.amount)?;

        let percentile_amount = bucket.percentile_amount(self.percentile, self.policy)?;
        let row = ResultRow {
            recipient_id: record.recipient_id.clone(),
            zip5: record.zip5.clone(),
            election_year: record.election_year.clone(),
            percentile_amount,
            running_total: bucket.total(),
            running_count: bucket.len(),
        };
        debug!(
            recipient = %row.recipient_id,
            zip = %row.zip5,
            year = %row.election_year,
            count = row.running_count,
            "repeat contribution"
        );

        Ok(Some(row))
    }

    /// Feed records in order, handing each produced row to `emit`.
    /// Returns the number of rows emitted.
    pub fn run<'r, I, F>(&mut self, records: I, mut emit: F) -> Result<usize>
    where
        I: IntoIterator<Item = &'r Record>,
        F: FnMut(ResultRow) -> Result<()>,
    {
        let mut emitted = 0;
        for record in records {
            if let Some(row) = self.process(record)? {
                emit(row)?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Distinct donor names seen so far.
    pub fn donor_count(&self) -> usize {
        self.seen_donors.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

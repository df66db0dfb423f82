// * Run-scoped deduplication by detail URL
// * Single pass, first occurrence kept. Records without a known URL are never collapsed.

use std::collections::HashSet;

use crate::engine::normalization::identity_key;
use crate::persistence::schema::ProgramRecord;

/// Result of offering one record to the deduplicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupResult {
    /// First time this identity was seen
    Unique,
    /// Identity already admitted earlier in the run
    Duplicate { key: String },
    /// No identity ("unknown" URL); always kept
    Unkeyed,
}

impl DedupResult {
    /// True when the record should be kept
    pub fn is_kept(&self) -> bool {
        !matches!(self, DedupResult::Duplicate { .. })
    }
}

/// Statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub total_offered: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub unkeyed: usize,
}

/// Seen-URL set for one multi-page run.
///
/// Not synchronized: when pages are extracted in parallel, merge their
/// results through one owner (or wrap this in a lock).
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    stats: DedupStats,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers one record and updates the seen set
    pub fn check(&mut self, record: &ProgramRecord) -> DedupResult {
        self.stats.total_offered += 1;

        let Some(key) = identity_key(&record.detail_url) else {
            self.stats.unkeyed += 1;
            return DedupResult::Unkeyed;
        };

        if self.seen.contains(&key) {
            self.stats.duplicates += 1;
            tracing::debug!(detail_url = %record.detail_url, "Duplicate record dropped");
            DedupResult::Duplicate { key }
        } else {
            self.seen.insert(key);
            self.stats.unique += 1;
            DedupResult::Unique
        }
    }

    /// Filters a batch, keeping first occurrences in order.
    /// The seen set persists, so later batches are checked against earlier ones.
    pub fn dedupe<I>(&mut self, records: I) -> Vec<ProgramRecord>
    where
        I: IntoIterator<Item = ProgramRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.check(record).is_kept())
            .collect()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }

    /// Clears the seen set and counters for a new run
    pub fn reset(&mut self) {
        self.seen.clear();
        self.stats = DedupStats::default();
    }
}

/// One-shot deduplication with a fresh seen set
pub fn dedupe<I>(records: I) -> Vec<ProgramRecord>
where
    I: IntoIterator<Item = ProgramRecord>,
{
    Deduplicator::new().dedupe(records)
}

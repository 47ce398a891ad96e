// Error Store - Project Vigil
// "The archive remembers every failure, but not forever"

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::types::{Category, ErrorRecord, Severity};

/// Store capacity configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum canonical records kept before eviction
    pub max_records: usize,
    /// Maximum occurrence log entries (FIFO)
    pub max_occurrences: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
            max_occurrences: 50_000,
        }
    }
}

/// One tracked occurrence, as recorded in the bounded occurrence log.
///
/// Carries a snapshot of the classification so rate, spike, and trend
/// computations never need to chase the canonical record.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub fingerprint: String,
    pub severity: Severity,
    pub category: Category,
    pub timestamp: DateTime<Utc>,
}

struct StoreInner {
    records: HashMap<String, ErrorRecord>,
    occurrences: VecDeque<Occurrence>,
}

/// Bounded collection of canonical error records keyed by fingerprint.
///
/// The write lock is held only for the O(1) lookup-and-increment or insert,
/// never across I/O or callback invocation.
pub struct ErrorStore {
    config: StoreConfig,
    inner: RwLock<StoreInner>,
}

impl ErrorStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(StoreInner {
                records: HashMap::new(),
                occurrences: VecDeque::new(),
            }),
        }
    }

    /// Add an error occurrence, aggregating into an existing record when the
    /// fingerprint is already known.
    ///
    /// Returns the canonical record for the fingerprint; its `id` is stable
    /// across occurrences. Eviction of the oldest 10% of records by
    /// `last_seen` runs inside this insertion path when the store exceeds
    /// its capacity.
    pub async fn add(&self, candidate: ErrorRecord) -> ErrorRecord {
        let occurrence = Occurrence {
            fingerprint: candidate.fingerprint.clone(),
            severity: candidate.severity,
            category: candidate.category,
            timestamp: candidate.timestamp,
        };

        let mut inner = self.inner.write().await;

        let canonical = if let Some(existing) = inner.records.get_mut(&candidate.fingerprint) {
            existing.count += 1;
            existing.last_seen = candidate.timestamp;
            existing.clone()
        } else {
            inner
                .records
                .insert(candidate.fingerprint.clone(), candidate.clone());
            if inner.records.len() > self.config.max_records {
                let evicted = Self::evict_oldest(&mut inner.records);
                debug!(evicted, "Evicted oldest error records");
            }
            candidate
        };

        inner.occurrences.push_back(occurrence);
        while inner.occurrences.len() > self.config.max_occurrences {
            inner.occurrences.pop_front();
        }

        canonical
    }

    /// Remove the oldest 10% of records by last_seen (at least one)
    fn evict_oldest(records: &mut HashMap<String, ErrorRecord>) -> usize {
        let mut by_age: Vec<(String, DateTime<Utc>)> = records
            .iter()
            .map(|(fingerprint, record)| (fingerprint.clone(), record.last_seen))
            .collect();
        by_age.sort_by_key(|(_, last_seen)| *last_seen);

        let to_remove = (records.len() / 10).max(1);
        for (fingerprint, _) in by_age.into_iter().take(to_remove) {
            records.remove(&fingerprint);
        }
        to_remove
    }

    /// Get a record by its id
    pub async fn get_by_id(&self, id: Uuid) -> Option<ErrorRecord> {
        let inner = self.inner.read().await;
        inner.records.values().find(|r| r.id == id).cloned()
    }

    /// Mark a record as resolved. Returns false when the id is unknown.
    pub async fn resolve(&self, id: Uuid, notes: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.records.values_mut().find(|r| r.id == id) {
            Some(record) => {
                record.resolved = true;
                record.resolution_notes = Some(notes.to_string());
                true
            }
            None => false,
        }
    }

    /// Most frequent errors: count descending, ties by most recent last_seen
    pub async fn top_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<ErrorRecord> = inner.records.values().cloned().collect();
        records.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
        });
        records.truncate(limit);
        records
    }

    /// Records seen at or after the cutoff, most recent first
    pub async fn recent_errors(&self, cutoff: DateTime<Utc>) -> Vec<ErrorRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<ErrorRecord> = inner
            .records
            .values()
            .filter(|r| r.last_seen >= cutoff)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        records
    }

    /// Count of occurrences at or after the cutoff.
    ///
    /// Timestamps are taken before the write lock, so concurrent tracks can
    /// land slightly out of order; the full (bounded) log is scanned rather
    /// than assuming it is sorted.
    pub async fn occurrences_since(&self, cutoff: DateTime<Utc>) -> usize {
        let inner = self.inner.read().await;
        inner
            .occurrences
            .iter()
            .filter(|o| o.timestamp >= cutoff)
            .count()
    }

    /// Momentary snapshot of all canonical records
    pub async fn records_snapshot(&self) -> Vec<ErrorRecord> {
        let inner = self.inner.read().await;
        inner.records.values().cloned().collect()
    }

    /// Momentary snapshot of the occurrence log
    pub async fn occurrences_snapshot(&self) -> Vec<Occurrence> {
        let inner = self.inner.read().await;
        inner.occurrences.iter().cloned().collect()
    }

    /// Number of canonical records currently stored
    pub async fn record_count(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Number of entries in the occurrence log
    pub async fn occurrence_count(&self) -> usize {
        self.inner.read().await.occurrences.len()
    }
}

// Statistics Engine - Project Vigil
// "Counting the dead is how the watch learns where the wall is weakest"


use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::{ErrorStore, Occurrence};
use crate::types::{ErrorRecord, ErrorStats, Severity, TopErrorEntry, TrendEntry};

/// How many top errors the stats snapshot carries
const TOP_ERRORS_LIMIT: usize = 10;

/// Stats engine configuration
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Interval between background recomputations
    pub refresh_interval: std::time::Duration,
    /// How long `stop` waits before aborting the background task
    pub stop_timeout: std::time::Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            refresh_interval: std::time::Duration::from_secs(60),
            stop_timeout: std::time::Duration::from_secs(5),
        }
    }
}

/// Periodically recomputes derived error statistics from store snapshots.
///
/// Readers always see a complete snapshot; the stats value is swapped
/// wholesale under the write lock, never patched field by field.
pub struct StatsEngine {
    config: StatsConfig,
    store: Arc<ErrorStore>,
    stats: RwLock<ErrorStats>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl StatsEngine {
    pub fn new(store: Arc<ErrorStore>, config: StatsConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            store,
            stats: RwLock::new(ErrorStats::default()),
            shutdown_tx,
            shutdown_rx,
            handle: Mutex::new(None),
        }
    }

    /// Start the background refresh loop. Idempotent.
    pub async fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return;
        }

        let engine = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_rx.clone();
        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.config.refresh_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!("📊 Stats engine started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.refresh().await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("📊 Stats engine stopping");
                            break;
                        }
                    }
                }
            }
        }));
    }

    /// Stop the background loop, aborting it if it misses the stop timeout
    pub async fn stop(&self) {
        let handle = self.handle.lock().await.take();
        let Some(mut handle) = handle else {
            return;
        };

        let _ = self.shutdown_tx.send(true);
        if tokio::time::timeout(self.config.stop_timeout, &mut handle)
            .await
            .is_err()
        {
            warn!("Stats engine did not stop in time, aborting");
            handle.abort();
        }
    }

    /// Recompute statistics from current store snapshots
    pub async fn refresh(&self) {
        let records = self.store.records_snapshot().await;
        let occurrences = self.store.occurrences_snapshot().await;
        let computed = compute_stats(&records, &occurrences, Utc::now());

        debug!(
            total_errors = computed.total_errors,
            error_rate = computed.error_rate,
            "Stats refreshed"
        );
        *self.stats.write().await = computed;
    }

    /// Current statistics snapshot (last refresh result)
    pub async fn current(&self) -> ErrorStats {
        self.stats.read().await.clone()
    }

    /// Per-day error rollups for the trailing `days` days, oldest first
    pub async fn trends(&self, days: u32) -> Vec<TrendEntry> {
        let occurrences = self.store.occurrences_snapshot().await;
        compute_trends(&occurrences, days, Utc::now())
    }
}

/// Derive a complete statistics snapshot from store state
pub fn compute_stats(
    records: &[ErrorRecord],
    occurrences: &[Occurrence],
    now: DateTime<Utc>,
) -> ErrorStats {
    let total_errors: u64 = records.iter().map(|r| r.count).sum();

    let hour_ago = now - Duration::hours(1);
    let last_hour = occurrences
        .iter()
        .filter(|o| o.timestamp >= hour_ago)
        .count();
    let error_rate = last_hour as f64 / 3600.0;

    // Histograms cover the trailing day only
    let day_ago = now - Duration::hours(24);
    let mut errors_by_severity: HashMap<String, u64> = HashMap::new();
    let mut errors_by_category: HashMap<String, u64> = HashMap::new();
    for record in records.iter().filter(|r| r.last_seen >= day_ago) {
        *errors_by_severity
            .entry(record.severity.to_string())
            .or_insert(0) += record.count;
        *errors_by_category
            .entry(record.category.to_string())
            .or_insert(0) += record.count;
    }

    let mut sorted: Vec<&ErrorRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.last_seen.cmp(&a.last_seen))
    });
    let top_errors = sorted
        .into_iter()
        .take(TOP_ERRORS_LIMIT)
        .map(|r| TopErrorEntry {
            fingerprint: r.fingerprint.clone(),
            message: r.message.clone(),
            count: r.count,
            severity: r.severity,
            category: r.category,
            last_seen: r.last_seen,
        })
        .collect();

    let resolved = records.iter().filter(|r| r.resolved).count();
    let resolution_rate = if records.is_empty() {
        0.0
    } else {
        resolved as f64 / records.len() as f64
    };

    // Only resolutions that recorded what was done count toward the mean
    let resolution_spans: Vec<f64> = records
        .iter()
        .filter(|r| r.resolved && r.resolution_notes.as_deref().is_some_and(|n| !n.is_empty()))
        .map(|r| (r.last_seen - r.first_seen).num_milliseconds() as f64 / 1000.0)
        .collect();
    let mean_time_to_resolution = if resolution_spans.is_empty() {
        0.0
    } else {
        resolution_spans.iter().sum::<f64>() / resolution_spans.len() as f64
    };

    ErrorStats {
        total_errors,
        error_rate,
        errors_by_severity,
        errors_by_category,
        top_errors,
        resolution_rate,
        mean_time_to_resolution,
    }
}

/// Roll the occurrence log up into per-day trend entries, oldest day first
pub fn compute_trends(occurrences: &[Occurrence], days: u32, now: DateTime<Utc>) -> Vec<TrendEntry> {
    let mut entries = Vec::with_capacity(days as usize);

    for offset in (0..days as i64).rev() {
        let day_end = now - Duration::days(offset);
        let day_start = day_end - Duration::days(1);

        let mut total: u64 = 0;
        let mut critical: u64 = 0;
        let mut by_category: BTreeMap<crate::types::Category, u64> = BTreeMap::new();

        for occurrence in occurrences {
            if occurrence.timestamp >= day_start && occurrence.timestamp < day_end {
                total += 1;
                if occurrence.severity == Severity::Critical {
                    critical += 1;
                }
                *by_category.entry(occurrence.category).or_insert(0) += 1;
            }
        }

        // Strict comparison keeps the first category in declaration order
        // when counts tie
        let mut top_category = "none".to_string();
        let mut top_count: u64 = 0;
        for (category, count) in &by_category {
            if *count > top_count {
                top_count = *count;
                top_category = category.to_string();
            }
        }

        entries.push(TrendEntry {
            date: day_end.format("%Y-%m-%d").to_string(),
            total_errors: total,
            critical_errors: critical,
            error_rate: total as f64 / 86_400.0,
            top_category,
        });
    }

    entries
}

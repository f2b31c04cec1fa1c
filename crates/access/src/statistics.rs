//! Per-operation call statistics.
//!
//! Each recorded call lands in exactly one of four buckets, chosen by its
//! scope and by whether it took longer than the scope's threshold:
//!
//! | Scope      | `elapsed <= threshold` | `elapsed > threshold` |
//! |------------|------------------------|-----------------------|
//! | `Internal` | internal success       | internal error        |
//! | `External` | external success       | external error        |
//!
//! Counters are created lazily per operation name. Increments happen under a
//! shared read lock on atomic counters, so concurrent recorders never lose an
//! update and [`Statistics::drain`] never misses one.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clap::Args;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Latency thresholds separating the success and error buckets.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Calls to our own backends slower than this (ms) count as errors.
    #[arg(long, env = "KEEL_INTERNAL_THRESHOLD_MS", default_value = "2000")]
    #[serde(default = "default_internal_threshold_ms")]
    pub internal_threshold_ms: u64,

    /// Calls to third-party services slower than this (ms) count as errors.
    #[arg(long, env = "KEEL_EXTERNAL_THRESHOLD_MS", default_value = "3000")]
    #[serde(default = "default_external_threshold_ms")]
    pub external_threshold_ms: u64,
}

fn default_internal_threshold_ms() -> u64 {
    2000
}

fn default_external_threshold_ms() -> u64 {
    3000
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            internal_threshold_ms: default_internal_threshold_ms(),
            external_threshold_ms: default_external_threshold_ms(),
        }
    }
}

/// Who the call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallScope {
    /// One of our own backends (search cluster, key-value store).
    Internal,
    /// A third-party service.
    External,
}

/// One of the four statistics buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Internal calls under the threshold.
    InternalSuccess,
    /// Internal calls over the threshold.
    InternalError,
    /// External calls under the threshold.
    ExternalSuccess,
    /// External calls over the threshold.
    ExternalError,
}

impl Bucket {
    /// All buckets in report order.
    pub const ALL: [Bucket; 4] = [
        Bucket::InternalSuccess,
        Bucket::InternalError,
        Bucket::ExternalSuccess,
        Bucket::ExternalError,
    ];

    fn classify(scope: CallScope, slow: bool) -> Self {
        match (scope, slow) {
            (CallScope::Internal, false) => Bucket::InternalSuccess,
            (CallScope::Internal, true) => Bucket::InternalError,
            (CallScope::External, false) => Bucket::ExternalSuccess,
            (CallScope::External, true) => Bucket::ExternalError,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Heading used for this bucket in [`Statistics::report`].
    pub fn title(self) -> &'static str {
        match self {
            Bucket::InternalSuccess => "Internal APIs",
            Bucket::InternalError => "Internal APIs (possible) errors",
            Bucket::ExternalSuccess => "External APIs",
            Bucket::ExternalError => "External APIs (possible) errors",
        }
    }
}

#[derive(Debug, Default)]
struct OperationCounter {
    hits: AtomicU64,
    total_ms: AtomicU64,
}

impl OperationCounter {
    fn add(&self, elapsed_ms: u64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    fn stats(&self, name: &str) -> OperationStats {
        OperationStats::new(
            name.to_string(),
            self.hits.load(Ordering::Relaxed),
            self.total_ms.load(Ordering::Relaxed),
        )
    }
}

type CounterTable = RwLock<HashMap<String, OperationCounter>>;

/// Counters for one operation in one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    /// Operation name, e.g. `Elasticsearch:getDocument`.
    pub name: String,
    /// Number of recorded calls.
    pub hits: u64,
    /// Summed latency in milliseconds.
    pub total_ms: u64,
    /// Mean latency in milliseconds.
    pub mean_ms: f64,
}

impl OperationStats {
    fn new(name: String, hits: u64, total_ms: u64) -> Self {
        let mean_ms = if hits == 0 {
            0.0
        } else {
            total_ms as f64 / hits as f64
        };
        Self {
            name,
            hits,
            total_ms,
            mean_ms,
        }
    }
}

/// All operations recorded in one bucket, sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    /// The bucket.
    pub bucket: Bucket,
    /// Its operations.
    pub operations: Vec<OperationStats>,
}

/// Point-in-time view of every counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// One entry per bucket, in [`Bucket::ALL`] order.
    pub buckets: Vec<BucketSnapshot>,
}

impl StatisticsSnapshot {
    /// Returns the counters for `name` in `bucket`, if any call was recorded.
    pub fn operation(&self, bucket: Bucket, name: &str) -> Option<&OperationStats> {
        self.buckets
            .iter()
            .find(|b| b.bucket == bucket)
            .and_then(|b| b.operations.iter().find(|op| op.name == name))
    }

    /// Total hits across all buckets.
    pub fn total_hits(&self) -> u64 {
        self.buckets
            .iter()
            .flat_map(|b| b.operations.iter())
            .map(|op| op.hits)
            .sum()
    }
}

/// Shared statistics recorder.
///
/// Meant to be created once and shared through `Arc` by every adapter that
/// records calls.
#[derive(Debug)]
pub struct Statistics {
    internal_threshold_ms: u64,
    external_threshold_ms: u64,
    tables: [CounterTable; 4],
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new(&StatisticsConfig::default())
    }
}

impl Statistics {
    /// Creates an empty recorder with the given thresholds.
    pub fn new(config: &StatisticsConfig) -> Self {
        Self {
            internal_threshold_ms: config.internal_threshold_ms,
            external_threshold_ms: config.external_threshold_ms,
            tables: Default::default(),
        }
    }

    /// Records a call that began at `started`.
    pub fn record(&self, operation: &str, started: Instant, scope: CallScope) -> Bucket {
        self.record_elapsed(operation, started.elapsed(), scope)
    }

    /// Records a call that took `elapsed`, returning the bucket it landed in.
    pub fn record_elapsed(&self, operation: &str, elapsed: Duration, scope: CallScope) -> Bucket {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let threshold = match scope {
            CallScope::Internal => self.internal_threshold_ms,
            CallScope::External => self.external_threshold_ms,
        };
        let bucket = Bucket::classify(scope, elapsed_ms > threshold);
        let table = &self.tables[bucket.index()];

        {
            let counters = table.read();
            if let Some(counter) = counters.get(operation) {
                counter.add(elapsed_ms);
                return bucket;
            }
        }

        table
            .write()
            .entry(operation.to_string())
            .or_default()
            .add(elapsed_ms);
        bucket
    }

    /// Returns a structured copy of every counter.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let buckets = Bucket::ALL
            .iter()
            .map(|&bucket| {
                let counters = self.tables[bucket.index()].read();
                Self::bucket_snapshot(bucket, &counters)
            })
            .collect();
        StatisticsSnapshot {
            taken_at: Utc::now(),
            buckets,
        }
    }

    /// Returns a snapshot and resets every counter.
    pub fn drain(&self) -> StatisticsSnapshot {
        let buckets = Bucket::ALL
            .iter()
            .map(|&bucket| {
                let counters = std::mem::take(&mut *self.tables[bucket.index()].write());
                Self::bucket_snapshot(bucket, &counters)
            })
            .collect();
        StatisticsSnapshot {
            taken_at: Utc::now(),
            buckets,
        }
    }

    fn bucket_snapshot(bucket: Bucket, counters: &HashMap<String, OperationCounter>) -> BucketSnapshot {
        let mut operations: Vec<OperationStats> = counters
            .iter()
            .map(|(name, counter)| counter.stats(name))
            .collect();
        operations.sort_by(|a, b| a.name.cmp(&b.name));
        BucketSnapshot { bucket, operations }
    }

    /// Renders every bucket as human-readable text.
    ///
    /// ```text
    /// Internal APIs:
    /// - Elasticsearch:getDocument: 3 hits
    /// - Elasticsearch:getDocument: 12.5 ms per call
    /// ```
    pub fn report(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();
        for bucket in &snapshot.buckets {
            let _ = writeln!(out, "{}:", bucket.bucket.title());
            for op in &bucket.operations {
                let _ = writeln!(out, "- {}: {} hits", op.name, op.hits);
                let _ = writeln!(out, "- {}: {} ms per call", op.name, op.mean_ms);
            }
            out.push('\n');
        }
        out
    }
}

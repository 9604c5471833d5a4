//! Token-usage accounting, aggregated per calendar month per device.
//!
//! The accumulator is a keyed numeric-increment store: every recorded
//! response adds to the bucket for (device, provider, model, year, month),
//! never overwriting. Months are derived from the invocation's own UTC
//! timestamp via calendar fields, not day arithmetic, so records near
//! month boundaries land in the right bucket.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::UsageError;
use crate::provider::ModelResponse;

/// An aggregation key for one usage bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageKey {
    pub device_id: String,
    pub provider: String,
    pub model: String,
    pub year: i32,
    pub month: u32,
}

impl UsageKey {
    /// Derive the bucket for a given UTC timestamp.
    pub fn for_timestamp(
        device_id: &str,
        provider: &str,
        model: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    /// The bucket for the current moment.
    pub fn now(device_id: &str, provider: &str, model: &str) -> Self {
        Self::for_timestamp(device_id, provider, model, Utc::now())
    }

    fn bucket_id(&self) -> String {
        format!(
            "{}|{}|{}|{:04}-{:02}",
            self.device_id, self.provider, self.model, self.year, self.month
        )
    }
}

/// Accumulated token counts for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketTotals {
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// The keyed-increment capability the pipeline requires of an accumulator.
pub trait UsageStore: Send + Sync {
    /// Add the given counts to the bucket, creating it if absent.
    fn increment(&self, key: &UsageKey, tokens_in: u64, tokens_out: u64)
    -> Result<(), UsageError>;

    /// Current totals for a bucket (zero when absent).
    fn totals(&self, key: &UsageKey) -> Result<BucketTotals, UsageError>;
}

/// JSON-file backed store with atomic writes.
pub struct JsonUsageStore {
    path: PathBuf,
}

impl JsonUsageStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_buckets(&self) -> Result<BTreeMap<String, BucketTotals>, UsageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(UsageError::Corrupt),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(UsageError::ReadFailed(e)),
        }
    }

    fn write_buckets(&self, buckets: &BTreeMap<String, BucketTotals>) -> Result<(), UsageError> {
        let parent = self
            .path
            .parent()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent).map_err(UsageError::WriteFailed)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(UsageError::WriteFailed)?;
        let json = serde_json::to_vec_pretty(buckets)
            .map_err(|e| UsageError::WriteFailed(std::io::Error::other(e)))?;
        tmp.write_all(&json).map_err(UsageError::WriteFailed)?;
        tmp.persist(&self.path)
            .map_err(|e| UsageError::WriteFailed(e.error))?;
        Ok(())
    }
}

impl UsageStore for JsonUsageStore {
    fn increment(
        &self,
        key: &UsageKey,
        tokens_in: u64,
        tokens_out: u64,
    ) -> Result<(), UsageError> {
        let mut buckets = self.read_buckets()?;
        let entry = buckets.entry(key.bucket_id()).or_default();
        entry.tokens_in += tokens_in;
        entry.tokens_out += tokens_out;
        self.write_buckets(&buckets)
    }

    fn totals(&self, key: &UsageKey) -> Result<BucketTotals, UsageError> {
        Ok(self
            .read_buckets()?
            .get(&key.bucket_id())
            .copied()
            .unwrap_or_default())
    }
}

/// In-memory store for tests and dry experimentation.
#[derive(Default)]
pub struct MemoryUsageStore {
    buckets: Mutex<BTreeMap<String, BucketTotals>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct buckets recorded so far.
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl UsageStore for MemoryUsageStore {
    fn increment(
        &self,
        key: &UsageKey,
        tokens_in: u64,
        tokens_out: u64,
    ) -> Result<(), UsageError> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| UsageError::WriteFailed(std::io::Error::other("poisoned lock")))?;
        let entry = buckets.entry(key.bucket_id()).or_default();
        entry.tokens_in += tokens_in;
        entry.tokens_out += tokens_out;
        Ok(())
    }

    fn totals(&self, key: &UsageKey) -> Result<BucketTotals, UsageError> {
        let buckets = self
            .buckets
            .lock()
            .map_err(|_| UsageError::ReadFailed(std::io::Error::other("poisoned lock")))?;
        Ok(buckets.get(&key.bucket_id()).copied().unwrap_or_default())
    }
}

/// Record a produced response in the accumulator.
///
/// Failures are logged and swallowed: usage accounting never blocks the
/// commit flow.
pub fn record_usage(store: &dyn UsageStore, device_id: &str, response: &ModelResponse) {
    let key = UsageKey::now(device_id, &response.provider, &response.model);
    if let Err(e) = store.increment(&key, response.tokens_in, response.tokens_out) {
        warn!("Failed to record token usage: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key_at(ts: DateTime<Utc>) -> UsageKey {
        UsageKey::for_timestamp("device-1", "openrouter", "test/model", ts)
    }

    #[test]
    fn test_same_bucket_sums_counts() {
        let store = MemoryUsageStore::new();
        let key = key_at(Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap());

        store.increment(&key, 100, 20).unwrap();
        store.increment(&key, 50, 5).unwrap();

        let totals = store.totals(&key).unwrap();
        assert_eq!(totals.tokens_in, 150);
        assert_eq!(totals.tokens_out, 25);
        assert_eq!(store.bucket_count(), 1);
    }

    #[test]
    fn test_month_boundary_lands_in_distinct_buckets() {
        let store = MemoryUsageStore::new();
        // Last instant of January vs first of February.
        let jan = key_at(Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap());
        let feb = key_at(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());

        store.increment(&jan, 10, 1).unwrap();
        store.increment(&feb, 20, 2).unwrap();

        assert_eq!(store.bucket_count(), 2);
        assert_eq!(store.totals(&jan).unwrap().tokens_in, 10);
        assert_eq!(store.totals(&feb).unwrap().tokens_in, 20);
    }

    #[test]
    fn test_distinct_models_are_distinct_buckets() {
        let store = MemoryUsageStore::new();
        let ts = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
        let a = UsageKey::for_timestamp("d", "openrouter", "model-a", ts);
        let b = UsageKey::for_timestamp("d", "openrouter", "model-b", ts);

        store.increment(&a, 5, 1).unwrap();
        store.increment(&b, 7, 2).unwrap();

        assert_eq!(store.bucket_count(), 2);
    }

    #[test]
    fn test_json_store_persists_and_sums() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        let key = key_at(Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap());

        {
            let store = JsonUsageStore::new(path.clone());
            store.increment(&key, 100, 10).unwrap();
        }
        {
            // A fresh handle sees the persisted bucket and adds to it.
            let store = JsonUsageStore::new(path.clone());
            store.increment(&key, 1, 1).unwrap();
            let totals = store.totals(&key).unwrap();
            assert_eq!(totals.tokens_in, 101);
            assert_eq!(totals.tokens_out, 11);
        }
    }

    #[test]
    fn test_json_store_missing_file_reads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonUsageStore::new(dir.path().join("absent.json"));
        let key = key_at(Utc::now());
        assert_eq!(store.totals(&key).unwrap(), BucketTotals::default());
    }

    #[test]
    fn test_record_usage_swallows_store_failure() {
        struct FailingStore;
        impl UsageStore for FailingStore {
            fn increment(&self, _: &UsageKey, _: u64, _: u64) -> Result<(), UsageError> {
                Err(UsageError::WriteFailed(std::io::Error::other("down")))
            }
            fn totals(&self, _: &UsageKey) -> Result<BucketTotals, UsageError> {
                Err(UsageError::ReadFailed(std::io::Error::other("down")))
            }
        }

        let response = ModelResponse {
            raw_text: "x".to_string(),
            tokens_in: 1,
            tokens_out: 1,
            provider: "p".to_string(),
            model: "m".to_string(),
        };
        // Must not panic or propagate.
        record_usage(&FailingStore, "device", &response);
    }
}

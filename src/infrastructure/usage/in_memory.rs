//! In-memory usage repository

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::usage::{UsageRecord, UsageRepository};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_usage_evicted;

/// In-memory usage repository
///
/// Records are kept in arrival order. With a cap, the oldest records are
/// evicted once it is exceeded; every eviction is counted and the first one
/// is logged. Without a cap only `delete_before` removes records.
#[derive(Debug)]
pub struct InMemoryUsageRepository {
    records: RwLock<Vec<UsageRecord>>,
    max_records: Option<usize>,
    evicted: AtomicU64,
}

impl InMemoryUsageRepository {
    /// `max_records == 0` means no cap
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            max_records: (max_records > 0).then_some(max_records),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Records dropped by the cap since startup
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryUsageRepository {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn append(&self, record: UsageRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        records.push(record);
        let Some(max_records) = self.max_records else {
            return Ok(());
        };
        if records.len() > max_records {
            let excess = records.len() - max_records;
            records.drain(..excess);

            let before = self.evicted.fetch_add(excess as u64, Ordering::Relaxed);
            if before == 0 {
                warn!(
                    max_records,
                    "Usage store is full; evicting oldest records. Lower usage.retention_days or raise usage.max_records"
                );
            }
            record_usage_evicted(excess as u64);
        }

        Ok(())
    }

    async fn query(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut results: Vec<UsageRecord> = records
            .iter()
            .filter(|r| since.is_none_or(|since| r.timestamp() >= since))
            .filter(|r| until.is_none_or(|until| r.timestamp() <= until))
            .cloned()
            .collect();

        results.sort_by_key(|r| r.timestamp());
        Ok(results)
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        let initial = records.len();
        records.retain(|r| r.timestamp() >= before);
        Ok(initial - records.len())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::RequestPath;
    use crate::domain::EngineId;
    use chrono::TimeZone;

    fn record_at(secs: i64) -> UsageRecord {
        UsageRecord::new("key-1", EngineId::Synthetic, RequestPath::Batch)
            .with_timestamp(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[tokio::test]
    async fn test_query_bounds_are_inclusive() {
        let repo = InMemoryUsageRepository::default();
        for secs in [100, 200, 300] {
            repo.append(record_at(secs)).await.unwrap();
        }

        let since = Utc.timestamp_opt(100, 0).unwrap();
        let until = Utc.timestamp_opt(200, 0).unwrap();
        let results = repo.query(Some(since), Some(until)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(repo.query(None, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_before_is_strict() {
        let repo = InMemoryUsageRepository::default();
        for secs in [100, 200, 300] {
            repo.append(record_at(secs)).await.unwrap();
        }

        let removed = repo
            .delete_before(Utc.timestamp_opt(200, 0).unwrap())
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_evicts_oldest() {
        let repo = InMemoryUsageRepository::new(2);
        for secs in [100, 200, 300] {
            repo.append(record_at(secs)).await.unwrap();
        }

        let remaining = repo.query(None, None).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].timestamp(), Utc.timestamp_opt(200, 0).unwrap());
        assert_eq!(repo.evicted(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_never_evicts() {
        let repo = InMemoryUsageRepository::new(0);
        for secs in 0..500 {
            repo.append(record_at(secs)).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 500);
        assert_eq!(repo.evicted(), 0);
    }
}

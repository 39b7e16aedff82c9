//! Usage storage trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::UsageRecord;
use crate::domain::DomainError;

/// Append-only storage for usage records
#[async_trait]
pub trait UsageRepository: Send + Sync + Debug {
    async fn append(&self, record: UsageRecord) -> Result<(), DomainError>;

    /// Records with `since <= timestamp <= until`; either bound may be open
    async fn query(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageRecord>, DomainError>;

    /// Remove every record with `timestamp < before`, returning how many went
    async fn delete_before(&self, before: DateTime<Utc>) -> Result<usize, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;
}

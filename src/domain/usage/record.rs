//! Usage record entities

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::engine::EngineId;

/// Key id recorded for requests admitted without authentication
pub const ANONYMOUS_KEY_ID: &str = "anonymous";

/// Capability path a request was served through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPath {
    Batch,
    Stream,
    Timestamps,
}

impl RequestPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Stream => "stream",
            Self::Timestamps => "timestamps",
        }
    }
}

impl std::fmt::Display for RequestPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One completed request. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    timestamp: DateTime<Utc>,
    key_id: String,
    engine: EngineId,
    path: RequestPath,
    character_count: usize,
    duration_ms: u64,
    status_code: u16,
}

impl UsageRecord {
    /// Create a record stamped with the current time and a 200 status
    pub fn new(key_id: impl Into<String>, engine: EngineId, path: RequestPath) -> Self {
        Self {
            timestamp: Utc::now(),
            key_id: key_id.into(),
            engine,
            path,
            character_count: 0,
            duration_ms: 0,
            status_code: 200,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_character_count(mut self, count: usize) -> Self {
        self.character_count = count;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }

    pub fn path(&self) -> RequestPath {
        self.path
    }

    pub fn character_count(&self) -> usize {
        self.character_count
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Totals for one grouping bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBucket {
    pub requests: u64,
    pub characters: u64,
}

impl UsageBucket {
    fn add(&mut self, record: &UsageRecord) {
        self.requests += 1;
        self.characters += record.character_count as u64;
    }
}

/// Aggregated usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_requests: u64,
    pub total_characters: u64,
    pub failed_requests: u64,
    pub avg_duration_ms: f64,
    pub by_key: HashMap<String, UsageBucket>,
    pub by_engine: HashMap<EngineId, UsageBucket>,
    pub by_path: HashMap<RequestPath, UsageBucket>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Self {
        let mut stats = Self::new();
        for record in records {
            stats.add_record(record);
        }
        stats
    }

    /// Add a usage record to the aggregate
    pub fn add_record(&mut self, record: &UsageRecord) {
        self.total_requests += 1;
        self.total_characters += record.character_count as u64;

        if !record.is_success() {
            self.failed_requests += 1;
        }

        // Update running average duration
        let prev_total = self.avg_duration_ms * (self.total_requests - 1) as f64;
        self.avg_duration_ms =
            (prev_total + record.duration_ms as f64) / self.total_requests as f64;

        self.by_key
            .entry(record.key_id.clone())
            .or_default()
            .add(record);
        self.by_engine.entry(record.engine).or_default().add(record);
        self.by_path.entry(record.path).or_default().add(record);
    }
}

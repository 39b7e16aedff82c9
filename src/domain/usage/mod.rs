//! Usage metering domain
//!
//! Immutable per-request records and the aggregates computed from them.

mod record;
mod repository;

pub use record::{RequestPath, UsageBucket, UsageRecord, UsageStats, ANONYMOUS_KEY_ID};
pub use repository::UsageRepository;

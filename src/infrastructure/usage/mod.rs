//! Usage tracking infrastructure implementations

mod in_memory;
mod recorder;

pub use in_memory::InMemoryUsageRepository;
pub use recorder::{spawn_retention_task, UsageRecorder, DEFAULT_BUFFER_SIZE};

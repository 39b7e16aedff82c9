//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod engine;
pub mod error;
pub mod streaming;
pub mod synthesis;
pub mod usage;

pub use api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyValidationError};
pub use engine::{
    resolve_credentials, AudioSink, CredentialResolution, CredentialSource, EngineAdapter,
    EngineCapabilities, EngineCredentials, EngineFactory, EngineId, EngineStatus,
};
pub use error::DomainError;
pub use streaming::{ControlFrame, SessionEvent, SessionPhase, SpeakFrame, StreamingSession};
pub use synthesis::{
    AudioFormat, SynthesisRequest, SynthesizedAudio, TimestampedAudio, Voice, VoiceSettings,
    WordTimestamp,
};
pub use usage::{RequestPath, UsageRecord, UsageRepository, UsageStats};

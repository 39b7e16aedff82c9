use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{EngineCredentials, EngineId};
use crate::domain::synthesis::{AudioFormat, SynthesisRequest, TimestampedAudio, Voice};
use crate::domain::DomainError;

/// Receives audio chunks in the order they are produced.
///
/// A closed receiver means the client went away; adapters stop producing.
pub type AudioSink = mpsc::Sender<Bytes>;

/// Static description of what an engine can do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineCapabilities {
    pub supports_streaming: bool,
    pub supports_timestamps: bool,
    pub supported_formats: Vec<AudioFormat>,
    /// Format returned when the requested one is not supported
    pub native_format: AudioFormat,
}

impl EngineCapabilities {
    pub fn supports_format(&self, format: AudioFormat) -> bool {
        self.supported_formats.contains(&format)
    }
}

/// Health snapshot of an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub available: bool,
    pub voice_count: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EngineStatus {
    pub fn uninitialized() -> Self {
        Self {
            available: false,
            voice_count: 0,
            message: "Not initialized".to_string(),
            error: None,
        }
    }

    pub fn ready(voice_count: usize) -> Self {
        Self {
            available: true,
            voice_count,
            message: format!("Ready with {} voices", voice_count),
            error: None,
        }
    }

    pub fn failed(error: &DomainError) -> Self {
        Self {
            available: false,
            voice_count: 0,
            message: "Initialization failed".to_string(),
            error: Some(error.to_string()),
        }
    }
}

/// Capability contract every speech engine implements
#[async_trait]
pub trait EngineAdapter: Send + Sync + Debug {
    fn engine_id(&self) -> EngineId;

    fn capabilities(&self) -> EngineCapabilities;

    fn default_voice(&self) -> Option<&str>;

    /// Vendor handshake. Fails with `MissingCredentials` or `VendorUnreachable`.
    async fn initialize(&self) -> Result<(), DomainError>;

    async fn get_voices(&self) -> Result<Vec<Voice>, DomainError>;

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, DomainError>;

    /// Push audio into `sink` as it is produced
    async fn synthesize_stream(
        &self,
        _request: &SynthesisRequest,
        _sink: AudioSink,
    ) -> Result<(), DomainError> {
        Err(DomainError::unsupported_capability(
            self.engine_id().as_str(),
            "streaming",
        ))
    }

    async fn synthesize_with_timestamps(
        &self,
        _request: &SynthesisRequest,
    ) -> Result<TimestampedAudio, DomainError> {
        Err(DomainError::unsupported_capability(
            self.engine_id().as_str(),
            "timestamps",
        ))
    }

    async fn get_status(&self) -> EngineStatus;
}

/// Builds unconfigured adapters; the registry owns initialization and caching
pub trait EngineFactory: Send + Sync + Debug {
    fn create(
        &self,
        engine: EngineId,
        credentials: Option<EngineCredentials>,
    ) -> Result<Arc<dyn EngineAdapter>, DomainError>;
}

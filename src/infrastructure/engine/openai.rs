use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::http_client::{attribute_to, forward_to_sink, HttpClientTrait};
use crate::domain::{
    AudioFormat, AudioSink, DomainError, EngineAdapter, EngineCapabilities, EngineId,
    EngineStatus, SynthesisRequest, Voice,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "alloy";
const VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// OpenAI text-to-speech engine
///
/// Batch and chunked streaming over the `/v1/audio/speech` endpoint. The
/// vendor offers no word timings.
#[derive(Debug)]
pub struct OpenAiEngine<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    status: RwLock<EngineStatus>,
}

impl<C: HttpClientTrait> OpenAiEngine<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();
        let auth_header = if api_key.is_empty() {
            String::new()
        } else {
            format!("Bearer {}", api_key)
        };

        Self {
            client,
            auth_header,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            status: RwLock::new(EngineStatus::uninitialized()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn speech_url(&self) -> String {
        format!("{}/v1/audio/speech", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &SynthesisRequest) -> serde_json::Value {
        let response_format = match request.format() {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Pcm16 => "pcm",
        };

        let mut body = json!({
            "model": self.model,
            "input": request.text(),
            "voice": request.voice().unwrap_or(DEFAULT_VOICE),
            "response_format": response_format,
        });

        if let Some(speed) = request.voice_settings().and_then(|s| s.speed) {
            body["speed"] = json!(speed);
        }

        body
    }

    fn ensure_credentials(&self) -> Result<(), DomainError> {
        if self.auth_header.is_empty() {
            return Err(DomainError::missing_credentials(EngineId::OpenAi.as_str()));
        }
        Ok(())
    }

    async fn handshake(&self) -> Result<(), DomainError> {
        self.ensure_credentials()?;

        // Listing models is the cheapest authenticated call
        self.client
            .get_json(&self.models_url(), self.headers())
            .await
            .map_err(|e| attribute_to(EngineId::OpenAi, e))?;
        Ok(())
    }
}

#[async_trait]
impl<C: HttpClientTrait> EngineAdapter for OpenAiEngine<C> {
    fn engine_id(&self) -> EngineId {
        EngineId::OpenAi
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_streaming: true,
            supports_timestamps: false,
            supported_formats: vec![AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::Pcm16],
            native_format: AudioFormat::Mp3,
        }
    }

    fn default_voice(&self) -> Option<&str> {
        Some(DEFAULT_VOICE)
    }

    async fn initialize(&self) -> Result<(), DomainError> {
        let result = self.handshake().await;
        *self.status.write().await = match &result {
            Ok(()) => {
                info!(engine = "openai", model = %self.model, "Engine initialized");
                EngineStatus::ready(VOICES.len())
            }
            Err(e) => EngineStatus::failed(e),
        };
        result
    }

    async fn get_voices(&self) -> Result<Vec<Voice>, DomainError> {
        Ok(VOICES
            .iter()
            .map(|id| Voice::new(*id, capitalize(id)))
            .collect())
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, DomainError> {
        self.ensure_credentials()?;
        debug!(engine = "openai", chars = request.character_count(), "Batch synthesis");

        self.client
            .post_for_bytes(&self.speech_url(), self.headers(), &self.build_request(request))
            .await
            .map_err(|e| attribute_to(EngineId::OpenAi, e))
    }

    async fn synthesize_stream(
        &self,
        request: &SynthesisRequest,
        sink: AudioSink,
    ) -> Result<(), DomainError> {
        self.ensure_credentials()?;
        debug!(engine = "openai", chars = request.character_count(), "Streaming synthesis");

        let stream = self
            .client
            .post_json_stream(&self.speech_url(), self.headers(), &self.build_request(request))
            .await
            .map_err(|e| attribute_to(EngineId::OpenAi, e))?;

        forward_to_sink(stream, &sink)
            .await
            .map_err(|e| attribute_to(EngineId::OpenAi, e))?;
        Ok(())
    }

    async fn get_status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

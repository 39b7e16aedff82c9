use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::http_client::{attribute_to, forward_to_sink, HttpClientTrait};
use crate::domain::{
    AudioFormat, AudioSink, DomainError, EngineAdapter, EngineCapabilities, EngineId,
    EngineStatus, SynthesisRequest, TimestampedAudio, Voice, WordTimestamp,
};

pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";
const DEFAULT_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_PCM_RATE: u32 = 24_000;
const PCM_RATES: [u32; 4] = [16_000, 22_050, 24_000, 44_100];

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
    #[serde(default)]
    labels: Option<VoiceLabels>,
}

#[derive(Debug, Deserialize)]
struct VoiceLabels {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimestampsResponse {
    audio_base64: String,
    #[serde(default)]
    alignment: Option<Alignment>,
}

#[derive(Debug, Deserialize)]
struct Alignment {
    characters: Vec<String>,
    character_start_times_seconds: Vec<f64>,
    character_end_times_seconds: Vec<f64>,
}

/// ElevenLabs text-to-speech engine
///
/// Supports batch, chunked streaming and character-aligned timestamps.
#[derive(Debug)]
pub struct ElevenLabsEngine<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    model: String,
    status: RwLock<EngineStatus>,
}

impl<C: HttpClientTrait> ElevenLabsEngine<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_ELEVENLABS_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
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

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("xi-api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn ensure_credentials(&self) -> Result<(), DomainError> {
        if self.api_key.is_empty() {
            return Err(DomainError::missing_credentials(EngineId::ElevenLabs.as_str()));
        }
        Ok(())
    }

    fn output_format(request: &SynthesisRequest) -> Result<String, DomainError> {
        match request.format() {
            AudioFormat::Mp3 => Ok("mp3_44100_128".to_string()),
            AudioFormat::Pcm16 => {
                let rate = request.sample_rate().unwrap_or(DEFAULT_PCM_RATE);
                if !PCM_RATES.contains(&rate) {
                    return Err(DomainError::validation(format!(
                        "Sample rate {} is not offered by elevenlabs",
                        rate
                    )));
                }
                Ok(format!("pcm_{}", rate))
            }
            other => Err(DomainError::unsupported_format(
                EngineId::ElevenLabs.as_str(),
                other.as_str(),
            )),
        }
    }

    fn speech_url(&self, request: &SynthesisRequest, suffix: &str) -> Result<String, DomainError> {
        let voice = request.voice().unwrap_or(DEFAULT_VOICE);
        // Voice ids become a path segment of a request carrying our vendor key
        if !voice
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(DomainError::validation(format!(
                "Invalid elevenlabs voice id '{}'",
                voice
            )));
        }
        Ok(format!(
            "{}/v1/text-to-speech/{}{}?output_format={}",
            self.base_url,
            voice,
            suffix,
            Self::output_format(request)?
        ))
    }

    fn voices_url(&self) -> String {
        format!("{}/v1/voices", self.base_url)
    }

    fn build_request(&self, request: &SynthesisRequest) -> serde_json::Value {
        let mut body = json!({
            "text": request.text(),
            "model_id": self.model,
        });

        if let Some(settings) = request.voice_settings() {
            let mut vs = serde_json::Map::new();
            if let Some(v) = settings.stability {
                vs.insert("stability".into(), json!(v));
            }
            if let Some(v) = settings.similarity_boost {
                vs.insert("similarity_boost".into(), json!(v));
            }
            if let Some(v) = settings.style {
                vs.insert("style".into(), json!(v));
            }
            if let Some(v) = settings.speed {
                vs.insert("speed".into(), json!(v));
            }
            if !vs.is_empty() {
                body["voice_settings"] = serde_json::Value::Object(vs);
            }
        }

        body
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, DomainError> {
        let value = self
            .client
            .get_json(&self.voices_url(), self.headers())
            .await
            .map_err(|e| attribute_to(EngineId::ElevenLabs, e))?;

        let response: VoicesResponse = serde_json::from_value(value).map_err(|e| {
            DomainError::provider("elevenlabs", format!("Failed to parse voices: {}", e))
        })?;

        Ok(response
            .voices
            .into_iter()
            .map(|entry| {
                let voice = Voice::new(entry.voice_id, entry.name);
                match entry.labels.and_then(|l| l.language) {
                    Some(language) => voice.with_language(language),
                    None => voice,
                }
            })
            .collect())
    }
}

/// Fold character-level alignment into word timings
fn words_from_alignment(alignment: &Alignment) -> Vec<WordTimestamp> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0.0;
    let mut end = 0.0;

    let entries = alignment
        .characters
        .iter()
        .zip(&alignment.character_start_times_seconds)
        .zip(&alignment.character_end_times_seconds);

    for ((ch, &char_start), &char_end) in entries {
        if ch.trim().is_empty() {
            if !current.is_empty() {
                words.push(word_timestamp(std::mem::take(&mut current), start, end));
            }
            continue;
        }
        if current.is_empty() {
            start = char_start;
        }
        current.push_str(ch);
        end = char_end;
    }

    if !current.is_empty() {
        words.push(word_timestamp(current, start, end));
    }
    words
}

fn word_timestamp(word: String, start_secs: f64, end_secs: f64) -> WordTimestamp {
    WordTimestamp {
        word,
        start_ms: (start_secs * 1000.0).round() as u64,
        end_ms: (end_secs * 1000.0).round() as u64,
    }
}

#[async_trait]
impl<C: HttpClientTrait> EngineAdapter for ElevenLabsEngine<C> {
    fn engine_id(&self) -> EngineId {
        EngineId::ElevenLabs
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_streaming: true,
            supports_timestamps: true,
            supported_formats: vec![AudioFormat::Mp3, AudioFormat::Pcm16],
            native_format: AudioFormat::Mp3,
        }
    }

    fn default_voice(&self) -> Option<&str> {
        Some(DEFAULT_VOICE)
    }

    async fn initialize(&self) -> Result<(), DomainError> {
        let result = match self.ensure_credentials() {
            Ok(()) => self.fetch_voices().await,
            Err(e) => Err(e),
        };

        let mut status = self.status.write().await;
        match result {
            Ok(voices) => {
                info!(engine = "elevenlabs", voices = voices.len(), "Engine initialized");
                *status = EngineStatus::ready(voices.len());
                Ok(())
            }
            Err(e) => {
                *status = EngineStatus::failed(&e);
                Err(e)
            }
        }
    }

    async fn get_voices(&self) -> Result<Vec<Voice>, DomainError> {
        self.ensure_credentials()?;
        self.fetch_voices().await
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, DomainError> {
        self.ensure_credentials()?;
        let url = self.speech_url(request, "")?;
        debug!(engine = "elevenlabs", chars = request.character_count(), "Batch synthesis");

        self.client
            .post_for_bytes(&url, self.headers(), &self.build_request(request))
            .await
            .map_err(|e| attribute_to(EngineId::ElevenLabs, e))
    }

    async fn synthesize_stream(
        &self,
        request: &SynthesisRequest,
        sink: AudioSink,
    ) -> Result<(), DomainError> {
        self.ensure_credentials()?;
        let url = self.speech_url(request, "/stream")?;
        debug!(engine = "elevenlabs", chars = request.character_count(), "Streaming synthesis");

        let stream = self
            .client
            .post_json_stream(&url, self.headers(), &self.build_request(request))
            .await
            .map_err(|e| attribute_to(EngineId::ElevenLabs, e))?;

        forward_to_sink(stream, &sink)
            .await
            .map_err(|e| attribute_to(EngineId::ElevenLabs, e))?;
        Ok(())
    }

    async fn synthesize_with_timestamps(
        &self,
        request: &SynthesisRequest,
    ) -> Result<TimestampedAudio, DomainError> {
        self.ensure_credentials()?;
        let url = self.speech_url(request, "/with-timestamps")?;

        let value = self
            .client
            .post_json(&url, self.headers(), &self.build_request(request))
            .await
            .map_err(|e| attribute_to(EngineId::ElevenLabs, e))?;

        let response: TimestampsResponse = serde_json::from_value(value).map_err(|e| {
            DomainError::provider("elevenlabs", format!("Failed to parse response: {}", e))
        })?;

        let audio = BASE64.decode(response.audio_base64.as_bytes()).map_err(|e| {
            DomainError::provider("elevenlabs", format!("Invalid audio encoding: {}", e))
        })?;

        let timestamps = match &response.alignment {
            Some(alignment) => words_from_alignment(alignment),
            None => {
                warn!(engine = "elevenlabs", "Response carried no alignment");
                Vec::new()
            }
        };

        Ok(TimestampedAudio {
            audio: Bytes::from(audio),
            format: request.format(),
            timestamps,
        })
    }

    async fn get_status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }
}

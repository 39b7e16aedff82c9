//! Synthesis request value object

use serde::{Deserialize, Serialize};

use crate::domain::engine::EngineId;
use crate::domain::DomainError;

/// Longest text accepted in a single request, in characters
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Accepted output sample rates in Hz
pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 48_000;

/// Audio encodings a caller may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Pcm16,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Pcm16 => "pcm16",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Pcm16 => "audio/pcm",
        }
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            "pcm16" | "pcm" => Ok(Self::Pcm16),
            other => Err(DomainError::validation(format!(
                "Unknown audio format '{}'. Expected wav, mp3 or pcm16",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional engine tunables
///
/// Ranges: stability, similarity_boost and style in [0, 1]; speed in [0.25, 4].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct VoiceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl VoiceSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        check_range("stability", self.stability, 0.0, 1.0)?;
        check_range("similarity_boost", self.similarity_boost, 0.0, 1.0)?;
        check_range("style", self.style, 0.0, 1.0)?;
        check_range("speed", self.speed, 0.25, 4.0)
    }
}

fn check_range(name: &str, value: Option<f32>, min: f32, max: f32) -> Result<(), DomainError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(DomainError::validation(format!(
            "voice_settings.{} must be between {} and {}",
            name, min, max
        ))),
        _ => Ok(()),
    }
}

/// A validated, immutable synthesis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<EngineId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<String>,
    format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_settings: Option<VoiceSettings>,
}

impl SynthesisRequest {
    pub fn builder(text: impl Into<String>) -> SynthesisRequestBuilder {
        SynthesisRequestBuilder::new(text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn engine(&self) -> Option<EngineId> {
        self.engine
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn voice_settings(&self) -> Option<&VoiceSettings> {
        self.voice_settings.as_ref()
    }

    pub fn character_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Copy of this request targeting another format
    pub fn with_format(&self, format: AudioFormat) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }
}

/// Builder for [`SynthesisRequest`]; validation happens in `build`
#[derive(Debug, Clone)]
pub struct SynthesisRequestBuilder {
    text: String,
    engine: Option<EngineId>,
    voice: Option<String>,
    format: AudioFormat,
    sample_rate: Option<u32>,
    voice_settings: Option<VoiceSettings>,
}

impl SynthesisRequestBuilder {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            engine: None,
            voice: None,
            format: AudioFormat::default(),
            sample_rate: None,
            voice_settings: None,
        }
    }

    pub fn engine(mut self, engine: EngineId) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn voice_settings(mut self, settings: VoiceSettings) -> Self {
        self.voice_settings = Some(settings);
        self
    }

    pub fn build(self) -> Result<SynthesisRequest, DomainError> {
        if self.text.trim().is_empty() {
            return Err(DomainError::validation("text must not be empty"));
        }

        let length = self.text.chars().count();
        if length > MAX_TEXT_LENGTH {
            return Err(DomainError::validation(format!(
                "text is {} characters, maximum is {}",
                length, MAX_TEXT_LENGTH
            )));
        }

        if let Some(rate) = self.sample_rate {
            if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
                return Err(DomainError::validation(format!(
                    "sample_rate must be between {} and {} Hz",
                    MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
                )));
            }
        }

        if let Some(settings) = &self.voice_settings {
            settings.validate()?;
        }

        let voice = self.voice.filter(|v| !v.trim().is_empty());

        Ok(SynthesisRequest {
            text: self.text,
            engine: self.engine,
            voice,
            format: self.format,
            sample_rate: self.sample_rate,
            voice_settings: self.voice_settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_minimal_request() {
        let request = SynthesisRequest::builder("Hello there").build().unwrap();

        assert_eq!(request.text(), "Hello there");
        assert_eq!(request.format(), AudioFormat::Wav);
        assert!(request.engine().is_none());
        assert!(request.voice().is_none());
        assert_eq!(request.character_count(), 11);
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(SynthesisRequest::builder("").build().is_err());
        assert!(SynthesisRequest::builder("  \n").build().is_err());
    }

    #[test]
    fn test_text_length_bound() {
        let at_limit = "a".repeat(MAX_TEXT_LENGTH);
        assert!(SynthesisRequest::builder(at_limit).build().is_ok());

        let over = "a".repeat(MAX_TEXT_LENGTH + 1);
        let err = SynthesisRequest::builder(over).build().unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let result = SynthesisRequest::builder("hi").sample_rate(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_rate_bounds() {
        for rate in [MIN_SAMPLE_RATE, 24_000, MAX_SAMPLE_RATE] {
            assert!(SynthesisRequest::builder("hi").sample_rate(rate).build().is_ok());
        }

        for rate in [MIN_SAMPLE_RATE - 1, MAX_SAMPLE_RATE + 1, 3_000_000_000] {
            let err = SynthesisRequest::builder("a").sample_rate(rate).build().unwrap_err();
            assert!(matches!(err, DomainError::Validation { .. }));
        }
    }

    #[test]
    fn test_voice_settings_bounds() {
        let ok = VoiceSettings {
            stability: Some(0.5),
            speed: Some(1.25),
            ..Default::default()
        };
        assert!(SynthesisRequest::builder("hi").voice_settings(ok).build().is_ok());

        let too_fast = VoiceSettings {
            speed: Some(5.0),
            ..Default::default()
        };
        let err = SynthesisRequest::builder("hi")
            .voice_settings(too_fast)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("speed"));
    }

    #[test]
    fn test_blank_voice_treated_as_default() {
        let request = SynthesisRequest::builder("hi").voice("  ").build().unwrap();
        assert!(request.voice().is_none());
    }

    #[test]
    fn test_with_format_leaves_original_untouched() {
        let request = SynthesisRequest::builder("hi")
            .format(AudioFormat::Mp3)
            .build()
            .unwrap();
        let pcm = request.with_format(AudioFormat::Pcm16);

        assert_eq!(request.format(), AudioFormat::Mp3);
        assert_eq!(pcm.format(), AudioFormat::Pcm16);
        assert_eq!(pcm.text(), "hi");
    }

    #[test]
    fn test_audio_format_parse() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("pcm".parse::<AudioFormat>().unwrap(), AudioFormat::Pcm16);
        assert!("ogg".parse::<AudioFormat>().is_err());
    }
}

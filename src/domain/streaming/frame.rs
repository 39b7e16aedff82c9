//! Text-channel control frames
//!
//! Control messages travel as JSON on the text channel; audio travels on the
//! binary channel. The channel, not a payload field, tells them apart.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::engine::EngineId;
use crate::domain::synthesis::{AudioFormat, SynthesisRequest, VoiceSettings};
use crate::domain::DomainError;

/// Body of a `{"type":"speak"}` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakFrame {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<AudioFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,
}

impl SpeakFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            engine: None,
            voice: None,
            format: None,
            sample_rate: None,
            voice_settings: None,
        }
    }

    /// Validate into a request
    pub fn into_request(self) -> Result<SynthesisRequest, DomainError> {
        let mut builder = SynthesisRequest::builder(self.text);
        if let Some(engine) = self.engine.as_deref().filter(|e| !e.trim().is_empty()) {
            builder = builder.engine(EngineId::parse(engine)?);
        }
        if let Some(voice) = self.voice {
            builder = builder.voice(voice);
        }
        if let Some(format) = self.format {
            builder = builder.format(format);
        }
        if let Some(sample_rate) = self.sample_rate {
            builder = builder.sample_rate(sample_rate);
        }
        if let Some(settings) = self.voice_settings {
            builder = builder.voice_settings(settings);
        }
        builder.build()
    }

    pub fn from_request(request: &SynthesisRequest) -> Self {
        Self {
            text: request.text().to_string(),
            engine: request.engine().map(|e| e.to_string()),
            voice: request.voice().map(str::to_string),
            format: Some(request.format()),
            sample_rate: request.sample_rate(),
            voice_settings: request.voice_settings().copied(),
        }
    }
}

/// A decoded control frame
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFrame {
    Speak(SpeakFrame),
    /// Synthesis started; remaining fields are informational
    Meta(Map<String, Value>),
    End,
    /// Normalized failure from either error encoding
    Error(String),
}

impl ControlFrame {
    /// Decode a text frame.
    ///
    /// Two error encodings exist on the wire and both decode to `Error`:
    /// `{"error": "x"}` and `{"message": "x", "code": "ERROR"}`.
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| DomainError::validation(format!("Invalid control frame: {}", e)))?;
        let Value::Object(mut object) = value else {
            return Err(DomainError::validation("Control frame must be a JSON object"));
        };

        if let Some(error) = object.get("error").and_then(Value::as_str) {
            return Ok(Self::Error(error.to_string()));
        }

        if object.get("code").and_then(Value::as_str) == Some("ERROR") {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Ok(Self::Error(message.to_string()));
        }

        let frame_type = object
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DomainError::validation("Control frame has no 'type' field"))?;

        match frame_type.as_str() {
            "speak" => {
                object.remove("type");
                let speak: SpeakFrame = serde_json::from_value(Value::Object(object))
                    .map_err(|e| DomainError::validation(format!("Invalid speak frame: {}", e)))?;
                Ok(Self::Speak(speak))
            }
            "meta" => {
                object.remove("type");
                Ok(Self::Meta(object))
            }
            "end" => Ok(Self::End),
            other => Err(DomainError::validation(format!(
                "Unknown control frame type '{}'",
                other
            ))),
        }
    }

    /// Encode for the text channel. Errors use the `{"error"}` form.
    pub fn to_json(&self) -> String {
        let value = match self {
            Self::Speak(speak) => {
                let mut value = serde_json::to_value(speak).unwrap_or_else(|_| json!({}));
                if let Value::Object(object) = &mut value {
                    object.insert("type".to_string(), json!("speak"));
                }
                value
            }
            Self::Meta(fields) => {
                let mut object = fields.clone();
                object.insert("type".to_string(), json!("meta"));
                Value::Object(object)
            }
            Self::End => json!({ "type": "end" }),
            Self::Error(message) => json!({ "type": "error", "error": message }),
        };
        value.to_string()
    }

    pub fn meta(engine: EngineId, format: AudioFormat, voice: Option<&str>) -> Self {
        let mut fields = Map::new();
        fields.insert("engine".to_string(), json!(engine.as_str()));
        fields.insert("format".to_string(), json!(format.as_str()));
        if let Some(voice) = voice {
            fields.insert("voice".to_string(), json!(voice));
        }
        Self::Meta(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_error_forms_normalize_to_same_message() {
        let form_a = ControlFrame::parse(r#"{"error":"x"}"#).unwrap();
        let form_b = ControlFrame::parse(r#"{"message":"x","code":"ERROR"}"#).unwrap();

        assert_eq!(form_a, ControlFrame::Error("x".to_string()));
        assert_eq!(form_a, form_b);
    }

    #[test]
    fn test_message_without_error_code_is_not_an_error() {
        let result = ControlFrame::parse(r#"{"message":"hello","code":"INFO"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_speak() {
        let frame = ControlFrame::parse(
            r#"{"type":"speak","text":"Hi","engine":"openai","format":"mp3","sample_rate":24000}"#,
        )
        .unwrap();

        let ControlFrame::Speak(speak) = frame else {
            panic!("expected speak frame");
        };
        let request = speak.into_request().unwrap();
        assert_eq!(request.text(), "Hi");
        assert_eq!(request.engine(), Some(EngineId::OpenAi));
        assert_eq!(request.format(), AudioFormat::Mp3);
        assert_eq!(request.sample_rate(), Some(24000));
    }

    #[test]
    fn test_speak_with_unknown_engine_fails_validation() {
        let speak = SpeakFrame {
            engine: Some("polly".to_string()),
            ..SpeakFrame::new("Hi")
        };
        assert!(speak.into_request().is_err());
    }

    #[test]
    fn test_parse_meta_and_end() {
        let meta = ControlFrame::parse(r#"{"type":"meta","engine":"openai"}"#).unwrap();
        match meta {
            ControlFrame::Meta(fields) => assert_eq!(fields["engine"], "openai"),
            other => panic!("unexpected frame {:?}", other),
        }

        assert_eq!(ControlFrame::parse(r#"{"type":"end"}"#).unwrap(), ControlFrame::End);
    }

    #[test]
    fn test_invalid_frames() {
        assert!(ControlFrame::parse("not json").is_err());
        assert!(ControlFrame::parse("[1,2]").is_err());
        assert!(ControlFrame::parse(r#"{"text":"no type"}"#).is_err());
        assert!(ControlFrame::parse(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_encoded_frames_decode_back() {
        let frames = vec![
            ControlFrame::meta(EngineId::Synthetic, AudioFormat::Pcm16, Some("tone-a")),
            ControlFrame::End,
            ControlFrame::Error("boom".to_string()),
            ControlFrame::Speak(SpeakFrame::new("hello")),
        ];

        for frame in frames {
            assert_eq!(ControlFrame::parse(&frame.to_json()).unwrap(), frame);
        }
    }
}

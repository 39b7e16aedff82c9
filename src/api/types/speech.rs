//! Speech endpoint bodies
//!
//! Requests reuse the speak frame shape so HTTP and WebSocket callers send the
//! same JSON.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::domain::{AudioFormat, EngineId, TimestampedAudio, Voice, WordTimestamp};
use crate::infrastructure::engine::EngineSummary;

/// `POST /v1/audio/speech/timestamps`
#[derive(Debug, Clone, Serialize)]
pub struct TimestampsResponse {
    pub engine: EngineId,
    pub format: AudioFormat,
    /// Base64 encoded audio
    pub audio: String,
    pub timestamps: Vec<WordTimestamp>,
}

impl TimestampsResponse {
    pub fn new(engine: EngineId, result: TimestampedAudio) -> Self {
        Self {
            engine,
            format: result.format,
            audio: STANDARD.encode(&result.audio),
            timestamps: result.timestamps,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnginesResponse {
    pub default_engine: EngineId,
    pub engines: Vec<EngineSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoicesResponse {
    pub engine: EngineId,
    pub voices: Vec<Voice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_timestamps_response_encodes_audio() {
        let result = TimestampedAudio {
            audio: Bytes::from_static(b"RIFF"),
            format: AudioFormat::Wav,
            timestamps: vec![WordTimestamp {
                word: "hi".to_string(),
                start_ms: 0,
                end_ms: 120,
            }],
        };

        let json = serde_json::to_value(TimestampsResponse::new(EngineId::Synthetic, result)).unwrap();

        assert_eq!(json["audio"], "UklGRg==");
        assert_eq!(json["format"], "wav");
        assert_eq!(json["engine"], "synthetic");
        assert_eq!(json["timestamps"][0]["end_ms"], 120);
    }
}

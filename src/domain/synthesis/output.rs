use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::AudioFormat;

/// A voice offered by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Timing of one spoken word, relative to the start of the audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Complete audio payload from a batch call
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub audio: Bytes,
    pub format: AudioFormat,
}

#[derive(Debug, Clone)]
pub struct TimestampedAudio {
    pub audio: Bytes,
    pub format: AudioFormat,
    pub timestamps: Vec<WordTimestamp>,
}

/// Split text into words and spread them evenly over `duration_ms`.
///
/// Used by engines whose vendor reports character-level timing or none at all.
pub fn distribute_word_timestamps(text: &str, duration_ms: u64) -> Vec<WordTimestamp> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    if total_chars == 0 {
        return Vec::new();
    }

    let mut cursor = 0u64;
    let mut consumed = 0usize;
    words
        .into_iter()
        .map(|word| {
            consumed += word.chars().count();
            let end_ms = duration_ms * consumed as u64 / total_chars as u64;
            let timestamp = WordTimestamp {
                word: word.to_string(),
                start_ms: cursor,
                end_ms,
            };
            cursor = end_ms;
            timestamp
        })
        .collect()
}

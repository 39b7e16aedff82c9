//! Synthesis requests and their results

mod output;
mod request;

pub use output::{
    distribute_word_timestamps, SynthesizedAudio, TimestampedAudio, Voice, WordTimestamp,
};
pub use request::{
    AudioFormat, SynthesisRequest, SynthesisRequestBuilder, VoiceSettings, MAX_TEXT_LENGTH,
};

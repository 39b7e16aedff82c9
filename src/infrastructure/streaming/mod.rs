//! Streaming session transport

mod client;

pub use client::{StreamedAudio, StreamingClient};

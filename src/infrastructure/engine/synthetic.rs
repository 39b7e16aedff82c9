//! Local test-tone engine
//!
//! Renders a sine tone whose length follows the text. Needs no key and no
//! network, so it backs trusted desktop mode and the test suite.

use std::f32::consts::PI;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::synthesis::distribute_word_timestamps;
use crate::domain::{
    AudioFormat, AudioSink, DomainError, EngineAdapter, EngineCapabilities, EngineId,
    EngineStatus, SynthesisRequest, TimestampedAudio, Voice,
};

const DEFAULT_SAMPLE_RATE: u32 = 16_000;
const MS_PER_CHAR: u64 = 50;
const MAX_DURATION_MS: u64 = 30_000;
const CHUNK_MS: u64 = 100;
const AMPLITUDE: f32 = 0.3;
const WAV_HEADER_LEN: usize = 44;

const VOICES: [(&str, &str, f32); 2] = [("tone-a", "Tone A4", 440.0), ("tone-c", "Tone C5", 523.25)];

#[derive(Debug)]
pub struct SyntheticEngine {
    status: RwLock<EngineStatus>,
}

impl SyntheticEngine {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(EngineStatus::uninitialized()),
        }
    }

    fn frequency(request: &SynthesisRequest) -> Result<f32, DomainError> {
        let voice = request.voice().unwrap_or(VOICES[0].0);
        VOICES
            .iter()
            .find(|(id, _, _)| *id == voice)
            .map(|(_, _, freq)| *freq)
            .ok_or_else(|| DomainError::validation(format!("Unknown synthetic voice '{}'", voice)))
    }

    fn check_format(request: &SynthesisRequest) -> Result<(), DomainError> {
        match request.format() {
            AudioFormat::Wav | AudioFormat::Pcm16 => Ok(()),
            other => Err(DomainError::unsupported_format(
                EngineId::Synthetic.as_str(),
                other.as_str(),
            )),
        }
    }

    /// Duration in milliseconds for `text`
    pub fn duration_ms(text: &str) -> u64 {
        (text.chars().count() as u64 * MS_PER_CHAR).min(MAX_DURATION_MS)
    }

    fn render_pcm(request: &SynthesisRequest) -> Result<Bytes, DomainError> {
        Self::check_format(request)?;
        let frequency = Self::frequency(request)?;
        let sample_rate = request.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE);
        let samples = sample_rate as u64 * Self::duration_ms(request.text()) / 1000;

        let mut pcm = BytesMut::with_capacity(samples as usize * 2);
        for n in 0..samples {
            let t = n as f32 / sample_rate as f32;
            let value = (2.0 * PI * frequency * t).sin() * AMPLITUDE;
            pcm.put_i16_le((value * i16::MAX as f32) as i16);
        }
        Ok(pcm.freeze())
    }

    fn encode(request: &SynthesisRequest, pcm: Bytes) -> Bytes {
        match request.format() {
            AudioFormat::Wav => {
                let sample_rate = request.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE);
                let mut out = BytesMut::with_capacity(WAV_HEADER_LEN + pcm.len());
                out.put_slice(&wav_header(sample_rate, pcm.len() as u32));
                out.put_slice(&pcm);
                out.freeze()
            }
            _ => pcm,
        }
    }
}

impl Default for SyntheticEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical 44-byte header for mono 16-bit PCM
pub fn wav_header(sample_rate: u32, data_len: u32) -> [u8; WAV_HEADER_LEN] {
    let mut header = BytesMut::with_capacity(WAV_HEADER_LEN);
    header.put_slice(b"RIFF");
    header.put_u32_le(data_len.saturating_add(36));
    header.put_slice(b"WAVE");
    header.put_slice(b"fmt ");
    header.put_u32_le(16);
    header.put_u16_le(1);
    header.put_u16_le(1);
    header.put_u32_le(sample_rate);
    header.put_u32_le(sample_rate.saturating_mul(2));
    header.put_u16_le(2);
    header.put_u16_le(16);
    header.put_slice(b"data");
    header.put_u32_le(data_len);

    let mut out = [0u8; WAV_HEADER_LEN];
    out.copy_from_slice(&header);
    out
}

#[async_trait]
impl EngineAdapter for SyntheticEngine {
    fn engine_id(&self) -> EngineId {
        EngineId::Synthetic
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_streaming: true,
            supports_timestamps: true,
            supported_formats: vec![AudioFormat::Wav, AudioFormat::Pcm16],
            native_format: AudioFormat::Wav,
        }
    }

    fn default_voice(&self) -> Option<&str> {
        Some(VOICES[0].0)
    }

    async fn initialize(&self) -> Result<(), DomainError> {
        *self.status.write().await = EngineStatus::ready(VOICES.len());
        Ok(())
    }

    async fn get_voices(&self) -> Result<Vec<Voice>, DomainError> {
        Ok(VOICES
            .iter()
            .map(|(id, name, _)| Voice::new(*id, *name))
            .collect())
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, DomainError> {
        let pcm = Self::render_pcm(request)?;
        debug!(engine = "synthetic", bytes = pcm.len(), "Rendered tone");
        Ok(Self::encode(request, pcm))
    }

    async fn synthesize_stream(
        &self,
        request: &SynthesisRequest,
        sink: AudioSink,
    ) -> Result<(), DomainError> {
        let pcm = Self::render_pcm(request)?;
        let sample_rate = request.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE);

        if request.format() == AudioFormat::Wav {
            sink.send(Bytes::copy_from_slice(&wav_header(sample_rate, pcm.len() as u32)))
                .await
                .map_err(|_| DomainError::session_failed("Audio sink closed"))?;
        }

        let chunk_len = ((sample_rate as u64 * CHUNK_MS / 1000) * 2).max(2) as usize;
        let mut offset = 0;
        while offset < pcm.len() {
            let end = (offset + chunk_len).min(pcm.len());
            sink.send(pcm.slice(offset..end))
                .await
                .map_err(|_| DomainError::session_failed("Audio sink closed"))?;
            offset = end;
        }
        Ok(())
    }

    async fn synthesize_with_timestamps(
        &self,
        request: &SynthesisRequest,
    ) -> Result<TimestampedAudio, DomainError> {
        let audio = self.synthesize(request).await?;
        Ok(TimestampedAudio {
            audio,
            format: request.format(),
            timestamps: distribute_word_timestamps(
                request.text(),
                Self::duration_ms(request.text()),
            ),
        })
    }

    async fn get_status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }
}

//! WebSocket client for the streaming session protocol
//!
//! Sends one speak frame and drives a `StreamingSession` until it reaches a
//! terminal phase or the exchange deadline passes.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::domain::{
    ControlFrame, DomainError, SessionEvent, SpeakFrame, StreamingSession, SynthesisRequest,
};

const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Audio and metadata from one completed exchange
#[derive(Debug, Clone)]
pub struct StreamedAudio {
    pub audio: Bytes,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone)]
pub struct StreamingClient {
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl StreamingClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one exchange on a fresh connection
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<StreamedAudio, DomainError> {
        let deadline = Instant::now() + self.timeout;

        let mut ws_request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| DomainError::validation(format!("Invalid stream URL: {}", e)))?;
        if let Some(api_key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| DomainError::validation("API key is not a valid header value"))?;
            ws_request.headers_mut().insert("Authorization", value);
        }

        let (mut socket, _) = tokio::time::timeout_at(
            deadline,
            tokio_tungstenite::connect_async(ws_request),
        )
        .await
        .map_err(|_| DomainError::timeout(self.timeout))?
        .map_err(|e| DomainError::vendor_unreachable("stream", e.to_string()))?;

        debug!(url = %self.url, "Stream connected");

        let mut session = StreamingSession::new();
        session.dispatch(request.clone())?;

        let speak = ControlFrame::Speak(SpeakFrame::from_request(request));
        socket
            .send(Message::text(speak.to_json()))
            .await
            .map_err(|e| DomainError::vendor_unreachable("stream", e.to_string()))?;

        let driven: Result<(), DomainError> = async {
            while !session.phase().is_terminal() {
                let event = match tokio::time::timeout_at(deadline, socket.next()).await {
                    Err(_) => SessionEvent::TimedOut(self.timeout),
                    Ok(None) => SessionEvent::PeerClosed,
                    Ok(Some(Err(e))) => {
                        warn!(error = %e, "Stream transport error");
                        SessionEvent::PeerClosed
                    }
                    Ok(Some(Ok(message))) => match message {
                        Message::Text(text) => match ControlFrame::parse(text.as_str()) {
                            Ok(frame) => SessionEvent::Control(frame),
                            Err(e) => SessionEvent::Control(ControlFrame::Error(e.to_string())),
                        },
                        Message::Binary(chunk) => SessionEvent::Audio(chunk),
                        Message::Close(_) => SessionEvent::PeerClosed,
                        _ => continue,
                    },
                };
                session.apply(event)?;
            }
            Ok(())
        }
        .await;

        let _ = socket.close(None).await;
        driven?;

        let metadata = session.metadata().cloned();
        let phase = session.phase();
        let audio = session.into_result()?;
        info!(?phase, bytes = audio.len(), "Stream exchange finished");

        Ok(StreamedAudio { audio, metadata })
    }
}

//! Per-connection exchange state machine

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::ControlFrame;
use crate::domain::synthesis::SynthesisRequest;
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Connected, no active request
    Idle,
    /// Request sent, nothing received yet
    Dispatching,
    /// At least one metadata or audio frame received
    Receiving,
    Completed,
    Failed,
    /// Connection gone
    Closed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Closed)
    }

    fn is_active(&self) -> bool {
        matches!(self, Self::Dispatching | Self::Receiving)
    }
}

/// Something that happened on the connection
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Control(ControlFrame),
    Audio(Bytes),
    PeerClosed,
    TimedOut(Duration),
}

/// State of one persistent connection carrying one exchange at a time
#[derive(Debug)]
pub struct StreamingSession {
    phase: SessionPhase,
    request: Option<SynthesisRequest>,
    buffer: BytesMut,
    metadata: Option<Map<String, Value>>,
    received_any: bool,
    failure: Option<DomainError>,
}

impl Default for StreamingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            request: None,
            buffer: BytesMut::new(),
            metadata: None,
            received_any: false,
            failure: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn request(&self) -> Option<&SynthesisRequest> {
        self.request.as_ref()
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    /// Audio accumulated so far in this exchange
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn failure(&self) -> Option<&DomainError> {
        self.failure.as_ref()
    }

    /// Idle -> Dispatching
    pub fn dispatch(&mut self, request: SynthesisRequest) -> Result<(), DomainError> {
        if self.phase != SessionPhase::Idle {
            return Err(DomainError::session_failed(format!(
                "Cannot start an exchange while {:?}",
                self.phase
            )));
        }
        self.request = Some(request);
        self.phase = SessionPhase::Dispatching;
        Ok(())
    }

    /// Return a completed session to Idle so the connection can carry the next exchange
    pub fn reset(&mut self) -> Result<(), DomainError> {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Completed | SessionPhase::Failed => {
                *self = Self::new();
                Ok(())
            }
            phase => Err(DomainError::session_failed(format!(
                "Cannot reset a session while {:?}",
                phase
            ))),
        }
    }

    /// Apply one event and return the resulting phase.
    ///
    /// Frames arriving while idle are a protocol violation and leave the phase
    /// unchanged. Events after a terminal phase are ignored.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, DomainError> {
        if matches!(event, SessionEvent::PeerClosed) {
            self.on_peer_closed();
            return Ok(self.phase);
        }

        if self.phase.is_terminal() {
            debug!(phase = ?self.phase, "Ignoring event on finished session");
            return Ok(self.phase);
        }

        if self.phase == SessionPhase::Idle {
            return Err(DomainError::session_failed(
                "Received a frame with no exchange in progress",
            ));
        }

        match event {
            SessionEvent::Control(ControlFrame::Meta(fields)) => {
                self.metadata = Some(fields);
                self.received_any = true;
                self.phase = SessionPhase::Receiving;
            }
            SessionEvent::Audio(chunk) => {
                self.buffer.extend_from_slice(&chunk);
                self.received_any = true;
                self.phase = SessionPhase::Receiving;
            }
            SessionEvent::Control(ControlFrame::End) => {
                self.phase = SessionPhase::Completed;
            }
            SessionEvent::Control(ControlFrame::Error(message)) => {
                self.fail(DomainError::session_failed(message));
            }
            SessionEvent::Control(ControlFrame::Speak(_)) => {
                return Err(DomainError::session_failed(
                    "A speak frame cannot be sent while an exchange is in progress",
                ));
            }
            SessionEvent::TimedOut(elapsed) => {
                self.fail(DomainError::timeout(elapsed));
            }
            SessionEvent::PeerClosed => unreachable!("handled above"),
        }

        Ok(self.phase)
    }

    /// Convenience for a text frame straight off the wire
    pub fn on_text(&mut self, text: &str) -> Result<SessionPhase, DomainError> {
        let frame = ControlFrame::parse(text)?;
        self.apply(SessionEvent::Control(frame))
    }

    pub fn on_audio(&mut self, chunk: impl Into<Bytes>) -> Result<SessionPhase, DomainError> {
        self.apply(SessionEvent::Audio(chunk.into()))
    }

    fn on_peer_closed(&mut self) {
        if self.phase.is_terminal() {
            return;
        }

        if !self.received_any {
            self.failure = Some(DomainError::ClosedBeforeData);
        } else if self.phase.is_active() {
            self.failure = Some(DomainError::session_failed(
                "Connection closed before the end frame",
            ));
        }
        self.phase = SessionPhase::Closed;
    }

    fn fail(&mut self, error: DomainError) {
        self.failure = Some(error);
        self.phase = SessionPhase::Failed;
    }

    /// Final outcome of the exchange
    pub fn into_result(self) -> Result<Bytes, DomainError> {
        match self.phase {
            SessionPhase::Completed => Ok(self.buffer.freeze()),
            SessionPhase::Failed | SessionPhase::Closed => Err(self
                .failure
                .unwrap_or(DomainError::ClosedBeforeData)),
            phase => Err(DomainError::session_failed(format!(
                "Exchange not finished ({:?})",
                phase
            ))),
        }
    }
}

//! Streaming session protocol

mod frame;
mod session;

pub use frame::{ControlFrame, SpeakFrame};
pub use session::{SessionEvent, SessionPhase, StreamingSession};

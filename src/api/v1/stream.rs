//! WebSocket streaming endpoint
//!
//! One connection carries any number of sequential exchanges. Each exchange
//! starts with a client speak frame and ends with `end` or an error frame; audio
//! goes out on the binary channel between `meta` and the terminal frame.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::middleware::Authenticated;
use crate::api::state::AppState;
use crate::domain::{ControlFrame, DomainError, SpeakFrame};
use crate::infrastructure::auth::Admission;
use crate::infrastructure::observability::record_stream_session;
use crate::infrastructure::routing::RouteOptions;

const AUDIO_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Failed,
    Disconnected,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
        }
    }
}

/// GET /v1/audio/stream
///
/// Authorization happens before the upgrade, so bad keys get a plain HTTP 401/429.
pub async fn stream_speech(
    State(state): State<AppState>,
    Authenticated(admission): Authenticated,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_connection(socket, state, admission))
}

async fn run_connection(mut socket: WebSocket, state: AppState, admission: Admission) {
    let key_id = admission.key_id().to_string();
    let idle_timeout = state.router.config().stream_timeout;
    debug!(key_id = %key_id, "Stream connection opened");

    loop {
        let message = match tokio::time::timeout(idle_timeout, socket.recv()).await {
            Err(_) => {
                debug!(key_id = %key_id, "Stream connection idle, closing");
                break;
            }
            Ok(None) | Ok(Some(Err(_))) => break,
            Ok(Some(Ok(message))) => message,
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            Message::Binary(_) => {
                if send_error(&mut socket, "Clients may only send text frames").await.is_err() {
                    break;
                }
                continue;
            }
            _ => continue,
        };

        let speak = match ControlFrame::parse(text.as_str()) {
            Ok(ControlFrame::Speak(speak)) => speak,
            Ok(_) => {
                if send_error(&mut socket, "Expected a speak frame").await.is_err() {
                    break;
                }
                continue;
            }
            Err(e) => {
                if send_error(&mut socket, e.to_string()).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let outcome = exchange(&mut socket, &state, &key_id, speak).await;
        record_stream_session(outcome.as_str());
        if outcome == Outcome::Disconnected {
            break;
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    debug!(key_id = %key_id, "Stream connection closed");
}

async fn exchange(
    socket: &mut WebSocket,
    state: &AppState,
    key_id: &str,
    speak: SpeakFrame,
) -> Outcome {
    let request = match speak.into_request() {
        Ok(request) => request,
        Err(e) => return report_failure(socket, e).await,
    };

    let (sink, audio) = mpsc::channel::<Bytes>(AUDIO_CHANNEL_CAPACITY);
    let options = RouteOptions::streaming(sink);

    let plan = match state.router.plan(key_id, request, &options).await {
        Ok(plan) => plan,
        Err(e) => return report_failure(socket, e).await,
    };

    info!(
        key_id = %key_id,
        engine = %plan.engine(),
        format = %plan.format(),
        "Starting stream exchange"
    );

    let meta = ControlFrame::meta(plan.engine(), plan.format(), plan.voice());
    if socket.send(Message::Text(meta.to_json().into())).await.is_err() {
        return Outcome::Disconnected;
    }

    let execute = state.router.execute(key_id, plan, options);
    let forward = async {
        // Owning the receiver here means an early return closes the channel
        // and stops the engine.
        let mut audio = audio;
        while let Some(chunk) = audio.recv().await {
            if socket.send(Message::Binary(chunk)).await.is_err() {
                return false;
            }
        }
        true
    };

    let (result, connected) = tokio::join!(execute, forward);
    if !connected {
        warn!(key_id = %key_id, "Client went away mid-stream");
        return Outcome::Disconnected;
    }

    match result {
        Ok(_) => {
            if socket
                .send(Message::Text(ControlFrame::End.to_json().into()))
                .await
                .is_err()
            {
                return Outcome::Disconnected;
            }
            Outcome::Completed
        }
        Err(e) => report_failure(socket, e).await,
    }
}

async fn report_failure(socket: &mut WebSocket, error: DomainError) -> Outcome {
    debug!(error = %error, "Stream exchange failed");
    match send_error(socket, error.to_string()).await {
        Ok(()) => Outcome::Failed,
        Err(()) => Outcome::Disconnected,
    }
}

async fn send_error(socket: &mut WebSocket, message: impl Into<String>) -> Result<(), ()> {
    let frame = ControlFrame::Error(message.into());
    socket
        .send(Message::Text(frame.to_json().into()))
        .await
        .map_err(|_| ())
}

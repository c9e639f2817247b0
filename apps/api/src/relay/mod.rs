//! Realtime transcription relay.
//!
//! One client WebSocket is bridged to one Deepgram live session: binary audio
//! frames go upstream verbatim in arrival order, non-empty transcript
//! fragments come back downstream in emission order. A straight pass-through
//! with no buffering beyond the single in-flight message per direction, no
//! retries, and no reconnection. Each session is independent; there is no
//! shared state across connections.

use std::time::Duration;

use axum::extract::ws::{Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as ProviderMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{DEEPGRAM_MODEL, LANGUAGE};
use crate::state::AppState;

const DEEPGRAM_LIVE_URL: &str = "wss://api.deepgram.com/v1/listen";
/// Graceful finalize message for the Deepgram live API.
const CLOSE_STREAM: &str = r#"{"type":"CloseStream"}"#;
/// Hardening measure: a session with no client audio for this long is closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

type ProviderSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay session lifecycle. Transitions are logged per session.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RelayState {
    Idle,
    Connecting,
    Streaming,
    Closed,
}

/// How one forwarding pump ended. None of these are failures of the relay
/// itself; a peer going away is a normal terminal state.
#[derive(Debug)]
enum PumpEnd {
    PeerClosed,
    PeerError(String),
    IdleTimeout,
}

#[derive(Debug, Error)]
enum ConnectError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid API key header: {0}")]
    Header(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),
}

/// GET /ws/transcribe
///
/// Upgrades the connection and runs one relay session to completion.
pub async fn ws_transcribe_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    let api_key = state.config.deepgram_api_key.clone();
    ws.on_upgrade(move |socket| relay_session(socket, api_key))
}

/// Drives one client connection through Idle → Connecting → Streaming →
/// Closed. Always releases the provider connection on exit, whichever side
/// ends the session.
async fn relay_session(client: WebSocket, api_key: String) {
    let session = Uuid::new_v4();
    let mut state = RelayState::Idle;
    info!("[relay {session}] client connected ({state:?})");

    state = RelayState::Connecting;
    debug!("[relay {session}] opening provider session ({state:?})");
    let provider = match connect_provider(&api_key).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("[relay {session}] could not connect to provider: {e}");
            let mut client = client;
            let _ = client.send(ClientMessage::Close(None)).await;
            return;
        }
    };

    // The live API sends no explicit ready event after the upgrade; the first
    // successful send marks entry into Streaming.
    state = RelayState::Streaming;
    debug!("[relay {session}] provider session open ({state:?})");

    let (mut provider_tx, mut provider_rx) = provider.split();
    let (mut client_tx, mut client_rx) = client.split();

    // Both pumps run concurrently; whichever ends first ends the session and
    // cancels the other.
    let end = tokio::select! {
        end = pump_client_to_provider(&mut client_rx, &mut provider_tx) => end,
        end = pump_provider_to_client(&mut provider_rx, &mut client_tx) => end,
    };

    state = RelayState::Closed;
    match &end {
        PumpEnd::PeerClosed => info!("[relay {session}] session ended: peer closed ({state:?})"),
        PumpEnd::IdleTimeout => info!("[relay {session}] session ended: idle timeout ({state:?})"),
        PumpEnd::PeerError(e) => warn!("[relay {session}] session ended: {e} ({state:?})"),
    }

    // Graceful finish: flush the provider session if it is still open, then
    // release both sockets. Errors here only mean the peer is already gone.
    let _ = provider_tx
        .send(ProviderMessage::Text(CLOSE_STREAM.to_string()))
        .await;
    let _ = provider_tx.close().await;
    let _ = client_tx.send(ClientMessage::Close(None)).await;
}

/// Opens the Deepgram live session: continuous recognition with smart
/// formatting, punctuation, and diarization enabled.
async fn connect_provider(api_key: &str) -> Result<ProviderSocket, ConnectError> {
    let url = format!(
        "{DEEPGRAM_LIVE_URL}?model={DEEPGRAM_MODEL}&language={LANGUAGE}\
         &smart_format=true&punctuate=true&diarize=true"
    );

    let mut request = url.as_str().into_client_request()?;
    request.headers_mut().insert(
        "Authorization",
        HeaderValue::from_str(&format!("Token {api_key}"))?,
    );

    let (stream, _) = connect_async(request).await?;
    Ok(stream)
}

/// Downstream → upstream: forwards every binary audio frame verbatim, in
/// arrival order. Returns when the client disconnects, errors, or goes idle.
///
/// Generic over the stream and sink so tests can drive it in memory.
async fn pump_client_to_provider<R, W>(client_rx: &mut R, provider_tx: &mut W) -> PumpEnd
where
    R: Stream<Item = Result<ClientMessage, axum::Error>> + Unpin,
    W: Sink<ProviderMessage> + Unpin,
    W::Error: std::fmt::Display,
{
    loop {
        let frame = match tokio::time::timeout(IDLE_TIMEOUT, client_rx.next()).await {
            Err(_) => return PumpEnd::IdleTimeout,
            Ok(None) => return PumpEnd::PeerClosed,
            Ok(Some(Err(e))) => return PumpEnd::PeerError(format!("client error: {e}")),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            ClientMessage::Binary(data) => {
                if let Err(e) = provider_tx.send(ProviderMessage::Binary(data)).await {
                    return PumpEnd::PeerError(format!("provider send failed: {e}"));
                }
            }
            ClientMessage::Close(_) => return PumpEnd::PeerClosed,
            // Pings are answered by the transport; text frames carry nothing
            // the provider understands and are dropped.
            _ => {}
        }
    }
}

/// Upstream → downstream: forwards every non-empty transcript fragment as a
/// text message, in emission order. Empty fragments are dropped.
///
/// Generic over the stream and sink so tests can drive it in memory.
async fn pump_provider_to_client<R, W>(provider_rx: &mut R, client_tx: &mut W) -> PumpEnd
where
    R: Stream<Item = Result<ProviderMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
    W: Sink<ClientMessage> + Unpin,
    W::Error: std::fmt::Display,
{
    while let Some(message) = provider_rx.next().await {
        match message {
            Ok(ProviderMessage::Text(payload)) => {
                if let Some(fragment) = extract_fragment(&payload) {
                    if let Err(e) = client_tx.send(ClientMessage::Text(fragment)).await {
                        return PumpEnd::PeerError(format!("client send failed: {e}"));
                    }
                }
            }
            Ok(ProviderMessage::Close(_)) => return PumpEnd::PeerClosed,
            Ok(_) => {}
            Err(e) => return PumpEnd::PeerError(format!("provider error: {e}")),
        }
    }
    PumpEnd::PeerClosed
}

// ────────────────────────────────────────────────────────────────────────────
// Provider message parsing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamingResponse {
    channel: StreamingChannel,
}

#[derive(Debug, Deserialize)]
struct StreamingChannel {
    alternatives: Vec<StreamingAlternative>,
}

#[derive(Debug, Deserialize)]
struct StreamingAlternative {
    transcript: String,
}

/// Pulls the transcript fragment out of a live-API message. Returns `None`
/// for empty fragments and for non-transcript messages (metadata, close
/// acknowledgements), which are never forwarded.
fn extract_fragment(payload: &str) -> Option<String> {
    let response: StreamingResponse = serde_json::from_str(payload).ok()?;
    let transcript = response.channel.alternatives.into_iter().next()?.transcript;
    (!transcript.is_empty()).then_some(transcript)
}

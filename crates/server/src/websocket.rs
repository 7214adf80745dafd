//! WebSocket Handler
//!
//! Thin transport adapter: client messages become orchestrator calls and
//! session events become outbound messages. Reply audio goes out as binary
//! frames; everything else is JSON.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use voice_gateway_core::{AudioEncoding, Role};
use voice_gateway_pipeline::{SessionEvent, SessionEvents, SessionState};

use crate::metrics::record_request;
use crate::state::AppState;

/// Messages accepted from the client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start {
        #[serde(default)]
        session_id: Option<String>,
    },
    /// Base64 audio with optional format metadata
    Audio {
        data: String,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        sample_rate: Option<u32>,
    },
    Text {
        text: String,
    },
    End,
    Ping,
}

/// JSON messages sent to the client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionStarted {
        session_id: String,
    },
    State {
        state: SessionState,
    },
    Transcript {
        role: Role,
        text: String,
        is_final: bool,
    },
    PlaybackStarted {
        encoding: AudioEncoding,
        sample_rate: u32,
        total_slices: usize,
    },
    Interrupted,
    Error {
        message: String,
    },
    Pong,
}

impl ServerMessage {
    fn into_message(self) -> Message {
        match serde_json::to_string(&self) {
            Ok(json) => Message::Text(json),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize outbound message");
                Message::Text(r#"{"type":"error","message":"internal error"}"#.to_string())
            },
        }
    }
}

/// Map a session event to its wire form
pub fn event_message(event: SessionEvent) -> Message {
    match event {
        SessionEvent::FrameReady { data, .. } => Message::Binary(data.to_vec()),
        SessionEvent::StateChanged(state) => ServerMessage::State { state }.into_message(),
        SessionEvent::Transcript(t) => ServerMessage::Transcript {
            role: t.role,
            text: t.text,
            is_final: t.is_final,
        }
        .into_message(),
        SessionEvent::PlaybackStarted {
            format,
            total_slices,
        } => ServerMessage::PlaybackStarted {
            encoding: format.encoding,
            sample_rate: format.sample_rate,
            total_slices,
        }
        .into_message(),
        SessionEvent::Interrupted => ServerMessage::Interrupted.into_message(),
        SessionEvent::Error { message } => ServerMessage::Error { message }.into_message(),
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    record_request("ws");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection state
struct Connection {
    state: AppState,
    outbound: mpsc::UnboundedSender<Message>,
    session_id: Option<String>,
}

impl Connection {
    fn reply(&self, message: ServerMessage) {
        let _ = self.outbound.send(message.into_message());
    }

    fn error(&self, message: impl Into<String>) {
        self.reply(ServerMessage::Error {
            message: message.into(),
        });
    }

    fn start(&mut self, requested: Option<String>) {
        if let Some(id) = &self.session_id {
            self.error(format!("session {} already started on this connection", id));
            return;
        }
        let id = requested
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        match self.state.orchestrator.start(&id) {
            Ok(events) => {
                self.reply(ServerMessage::SessionStarted {
                    session_id: id.clone(),
                });
                tokio::spawn(forward_events(events, self.outbound.clone()));
                self.session_id = Some(id);
            },
            Err(e) => self.error(e.to_string()),
        }
    }

    fn audio(&self, data: Bytes, encoding: Option<AudioEncoding>, sample_rate: Option<u32>) {
        let Some(id) = &self.session_id else {
            self.error("no active session; send start first");
            return;
        };
        if let Err(e) = self
            .state
            .orchestrator
            .audio_chunk(id, data, encoding, sample_rate)
        {
            self.error(e.to_string());
        }
    }

    fn handle_text(&mut self, raw: &str) {
        let message = match serde_json::from_str::<ClientMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                self.error(format!("invalid message: {}", e));
                return;
            },
        };

        match message {
            ClientMessage::Start { session_id } => self.start(session_id),
            ClientMessage::Audio {
                data,
                format,
                sample_rate,
            } => {
                let encoding = match format.as_deref().map(str::parse::<AudioEncoding>).transpose() {
                    Ok(encoding) => encoding,
                    Err(e) => {
                        self.error(e.to_string());
                        return;
                    },
                };
                match BASE64.decode(data.as_bytes()) {
                    Ok(bytes) => self.audio(Bytes::from(bytes), encoding, sample_rate),
                    Err(e) => self.error(format!("invalid base64 audio: {}", e)),
                }
            },
            ClientMessage::Text { text } => match &self.session_id {
                Some(id) => {
                    if let Err(e) = self.state.orchestrator.inject_text(id, text) {
                        self.error(e.to_string());
                    }
                },
                None => self.error("no active session; send start first"),
            },
            ClientMessage::End => self.end(),
            ClientMessage::Ping => self.reply(ServerMessage::Pong),
        }
    }

    fn end(&mut self) {
        if let Some(id) = self.session_id.take() {
            if let Err(e) = self.state.orchestrator.end(&id) {
                tracing::debug!(session_id = %id, error = %e, "Session already gone");
            }
        }
    }
}

async fn forward_events(mut events: SessionEvents, outbound: mpsc::UnboundedSender<Message>) {
    while let Some(event) = events.recv().await {
        if outbound.send(event_message(event)).is_err() {
            break;
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(e) = sink.send(message).await {
                tracing::debug!(error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut conn = Connection {
        state,
        outbound,
        session_id: None,
    };

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => conn.handle_text(&text),
            Ok(Message::Binary(data)) => conn.audio(Bytes::from(data), None, None),
            Ok(Message::Close(_)) => break,
            Ok(_) => {},
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket receive failed");
                break;
            },
        }
    }

    conn.end();
    drop(conn);
    let _ = writer.await;
    tracing::debug!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_gateway_core::{AudioFormat, TranscriptEvent};

    #[test]
    fn test_audio_message_parsing() {
        let raw = r#"{"type":"audio","data":"AAEC","format":"mulaw","sample_rate":8000}"#;
        match serde_json::from_str::<ClientMessage>(raw).unwrap() {
            ClientMessage::Audio {
                data,
                format,
                sample_rate,
            } => {
                assert_eq!(BASE64.decode(data).unwrap(), vec![0, 1, 2]);
                assert_eq!(format.as_deref(), Some("mulaw"));
                assert_eq!(sample_rate, Some(8000));
            },
            other => panic!("unexpected {:?}", other),
        }

        let bare: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert!(matches!(bare, ClientMessage::Start { session_id: None }));
    }

    #[test]
    fn test_events_on_the_wire() {
        let frame = event_message(SessionEvent::FrameReady {
            data: Bytes::from_static(&[1, 2, 3, 4]),
            format: AudioFormat::default(),
            sequence: 0,
        });
        assert!(matches!(frame, Message::Binary(ref b) if b == &[1, 2, 3, 4]));

        let Message::Text(state) = event_message(SessionEvent::StateChanged(SessionState::Speaking))
        else {
            panic!("expected text");
        };
        assert_eq!(state, r#"{"type":"state","state":"speaking"}"#);

        let Message::Text(transcript) =
            event_message(SessionEvent::Transcript(TranscriptEvent::partial("hel")))
        else {
            panic!("expected text");
        };
        let value: serde_json::Value = serde_json::from_str(&transcript).unwrap();
        assert_eq!(value["type"], "transcript");
        assert_eq!(value["is_final"], false);
    }
}

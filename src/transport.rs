//! WebSocket transport to the transcription backend.
//!
//! Outbound traffic is raw PCM, one binary frame per block, plus the
//! single text control token `stop`. Inbound frames are JSON text of the
//! form `{"text": ...}`. The socket is split into a writer task fed by a
//! command channel and a reader task that surfaces transport events. No
//! acks, no sequencing, no retries; TCP ordering is trusted.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::audio::PcmBlock;
use crate::error::{DecodeError, TransportError};

/// Control token requesting graceful termination. The server flushes any
/// pending transcript and closes the socket itself, so the token goes
/// out before the client-side close.
const STOP_TOKEN: &str = "stop";

/// Distinguishes connections so a session can ignore events from a
/// socket it never owned (a previous session's close arriving late).
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Event surfaced to the session, stamped with its connection id.
#[derive(Debug)]
pub struct TransportEvent {
    pub connection: u64,
    pub kind: TransportEventKind,
}

#[derive(Debug)]
pub enum TransportEventKind {
    /// One decoded transcript message.
    Text(String),
    /// The socket closed (peer close frame or EOF).
    Closed,
    /// Socket-level failure.
    Error(String),
}

/// Session-facing transport seam.
pub trait TransportLink {
    fn connection_id(&self) -> u64;
    /// Queue one PCM block. Drops silently once the socket is closing.
    fn send_block(&self, block: PcmBlock);
    /// Queue the stop control token.
    fn send_stop(&self);
    /// Start the client-side close handshake.
    fn close(&self);
}

enum Outbound {
    Block(PcmBlock),
    Stop,
    Close,
}

/// Live WebSocket connection to the backend.
pub struct WsTransport {
    connection: u64,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl WsTransport {
    /// Connect to the backend. Events flow into `events` until the
    /// socket closes or fails.
    pub async fn connect(
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let connection = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        info!(url, connection, "Transcription socket open");

        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

        // Writer task: owns the sink. Ends when the handle is dropped or
        // a send fails; the reader surfaces the failure.
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let result = match msg {
                    Outbound::Block(block) => {
                        sink.send(Message::Binary(block.into_le_bytes())).await
                    }
                    Outbound::Stop => sink.send(Message::Text(STOP_TOKEN.into())).await,
                    Outbound::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                };
                if result.is_err() {
                    break;
                }
            }
            debug!(connection, "Transport writer exiting");
        });

        // Reader task: decodes inbound frames. A malformed frame is
        // logged and skipped; the stream keeps going.
        let event_connection = connection;
        tokio::spawn(async move {
            let send = |kind| {
                events.send(TransportEvent {
                    connection: event_connection,
                    kind,
                })
            };
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(raw))) => match decode_text_frame(&raw) {
                        Ok(text) => {
                            if send(TransportEventKind::Text(text)).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(connection = event_connection, "{}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = send(TransportEventKind::Closed);
                        break;
                    }
                    // Binary, ping and pong frames from the server carry
                    // nothing for us.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = send(TransportEventKind::Error(e.to_string()));
                        break;
                    }
                }
            }
            debug!(connection = event_connection, "Transport reader exiting");
        });

        Ok(Self {
            connection,
            outbound_tx,
        })
    }
}

impl TransportLink for WsTransport {
    fn connection_id(&self) -> u64 {
        self.connection
    }

    fn send_block(&self, block: PcmBlock) {
        let _ = self.outbound_tx.send(Outbound::Block(block));
    }

    fn send_stop(&self) {
        let _ = self.outbound_tx.send(Outbound::Stop);
    }

    fn close(&self) {
        let _ = self.outbound_tx.send(Outbound::Close);
    }
}

/// Decode one inbound frame: a JSON object with a `text` field. Anything
/// else is a decode failure for that message only.
fn decode_text_frame(raw: &str) -> Result<String, DecodeError> {
    #[derive(Deserialize)]
    struct TranscriptFrame {
        text: String,
    }

    serde_json::from_str::<TranscriptFrame>(raw)
        .map(|frame| frame.text)
        .map_err(|e| DecodeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_text_field() {
        assert_eq!(decode_text_frame(r#"{"text":"hello "}"#).unwrap(), "hello ");
    }

    #[test]
    fn tolerates_extra_fields() {
        let raw = r#"{"text":"world","final":true}"#;
        assert_eq!(decode_text_frame(raw).unwrap(), "world");
    }

    #[test]
    fn rejects_non_json() {
        assert!(decode_text_frame("not json").is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(decode_text_frame(r#"{"message":"hello"}"#).is_err());
        assert!(decode_text_frame(r#"{"text":5}"#).is_err());
        assert!(decode_text_frame(r#""just a string""#).is_err());
    }
}

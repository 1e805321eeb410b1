//! Recording session state machine.
//!
//! One `RecordingSession` per recording. It exclusively owns the capture
//! handle and the transport link, reacts to discrete events from both,
//! and emits presentation events. Every handler validates the current
//! state before acting; audio arriving in the wrong state is dropped,
//! never buffered. All transitions happen on the orchestration task, so
//! no locking is involved.
//!
//! Terminal sessions (Stopped, Failed) hold no resources and ignore
//! further events; the next recording needs a fresh instance.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::capture::CaptureControl;
use crate::audio::PcmBlock;
use crate::error::CaptureError;
use crate::ipc::{CoreEvent, StatusStage};
use crate::transport::{TransportEvent, TransportEventKind, TransportLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    AwaitingCapture,
    Streaming,
    Stopping,
    Stopped,
    Failed,
}

pub struct RecordingSession {
    id: Uuid,
    state: SessionState,
    transport: Option<Box<dyn TransportLink>>,
    /// Id of the connection this session owns; events stamped with any
    /// other id are stale and ignored. Survives shutdown so the server's
    /// final flush is still accepted.
    connection: Option<u64>,
    capture: Option<Box<dyn CaptureControl>>,
    transcript: String,
    events: mpsc::UnboundedSender<CoreEvent>,
}

impl RecordingSession {
    pub fn new(events: mpsc::UnboundedSender<CoreEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            transport: None,
            connection: None,
            capture: None,
            transcript: String::new(),
            events,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Stopped | SessionState::Failed)
    }

    /// Transcript accumulated so far, in arrival order.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events.send(event);
    }

    fn emit_status(&self, stage: StatusStage) {
        self.emit(CoreEvent::Status { stage });
    }

    /// Idle -> Connecting. Any other state is a silent no-op: a second
    /// start while one is in flight must not corrupt the session.
    pub fn begin(&mut self) -> bool {
        if self.state != SessionState::Idle {
            debug!(session = %self.id, state = ?self.state, "begin ignored");
            return false;
        }
        info!(session = %self.id, "Recording session starting");
        self.state = SessionState::Connecting;
        self.emit_status(StatusStage::Connecting);
        true
    }

    /// Transport connected: Connecting -> AwaitingCapture. The caller
    /// opens capture next.
    pub fn on_transport_open(&mut self, transport: Box<dyn TransportLink>) {
        if self.state != SessionState::Connecting {
            // Raced with stop or failure. Release the socket right away.
            transport.close();
            return;
        }
        self.connection = Some(transport.connection_id());
        self.transport = Some(transport);
        self.state = SessionState::AwaitingCapture;
        self.emit_status(StatusStage::RequestingDevice);
    }

    /// The socket never opened. Same handling as a lost transport.
    pub fn on_connect_failed(&mut self, message: &str) {
        self.on_transport_lost(message);
    }

    /// Capture opened: AwaitingCapture -> Streaming.
    pub fn on_capture_open(&mut self, mut capture: Box<dyn CaptureControl>) {
        if self.state != SessionState::AwaitingCapture {
            capture.close();
            return;
        }
        self.capture = Some(capture);
        self.state = SessionState::Streaming;
        info!(session = %self.id, "Streaming");
        self.emit(CoreEvent::RecordingStart {});
        self.emit_status(StatusStage::Streaming);
    }

    /// Capture could not be opened.
    pub fn on_capture_failed(&mut self, err: &CaptureError) {
        self.fail(&err.to_string());
    }

    /// The capture stream died mid-session.
    pub fn on_capture_error(&mut self, message: &str) {
        self.fail(message);
    }

    /// Route one transport event, discarding events from connections
    /// this session never owned.
    pub fn on_transport_event(&mut self, event: TransportEvent) {
        if self.connection != Some(event.connection) {
            debug!(session = %self.id, connection = event.connection, "Ignoring stale transport event");
            return;
        }
        match event.kind {
            TransportEventKind::Text(text) => self.on_transcript(text),
            TransportEventKind::Closed => self.on_transport_lost("connection closed"),
            TransportEventKind::Error(message) => self.on_transport_lost(&message),
        }
    }

    /// One PCM block from the capture thread. Forwarded only while
    /// Streaming; anything else is dropped, never buffered.
    pub fn on_block(&mut self, block: PcmBlock) {
        if self.state != SessionState::Streaming {
            return;
        }
        if let Some(transport) = &self.transport {
            transport.send_block(block);
        }
    }

    /// User stop. Safe from any state and idempotent: repeated calls
    /// produce exactly one teardown, and even if tracked state drifted
    /// the resources are released.
    pub fn stop(&mut self) {
        match self.state {
            SessionState::Idle
            | SessionState::Stopping
            | SessionState::Stopped
            | SessionState::Failed => return,
            _ => {}
        }
        info!(session = %self.id, transcript_chars = self.transcript().len(), "Stop requested");
        let was_streaming = self.state == SessionState::Streaming;
        self.state = SessionState::Stopping;
        self.shutdown(true);
        self.state = SessionState::Stopped;
        if was_streaming {
            self.emit(CoreEvent::RecordingStop {});
        }
        self.emit_status(StatusStage::Stopped);
    }

    /// Append one transcript message.
    ///
    /// Not gated on state: the backend flushes a final message after the
    /// stop token, and that text still belongs to this session.
    fn on_transcript(&mut self, text: String) {
        self.transcript.push_str(&text);
        self.emit(CoreEvent::Transcript { text });
    }

    /// Socket error or unexpected close, treated uniformly: release the
    /// capture, never resend the stop token, no reconnect.
    fn on_transport_lost(&mut self, message: &str) {
        match self.state {
            SessionState::Connecting | SessionState::AwaitingCapture | SessionState::Streaming => {}
            // Expected after our own close, and irrelevant once terminal.
            _ => return,
        }
        warn!(session = %self.id, "Transport lost: {}", message);
        let was_streaming = self.state == SessionState::Streaming;
        self.state = SessionState::Stopping;
        self.shutdown(false);
        self.state = SessionState::Stopped;
        if was_streaming {
            self.emit(CoreEvent::RecordingStop {});
        }
        self.emit(CoreEvent::Error {
            message: message.to_string(),
        });
        self.emit_status(StatusStage::Error);
    }

    /// Unrecoverable capture failure: tear down everything, surface the
    /// error, end in Failed.
    fn fail(&mut self, message: &str) {
        if self.is_terminal() {
            return;
        }
        warn!(session = %self.id, "Capture failure: {}", message);
        let was_streaming = self.state == SessionState::Streaming;
        self.state = SessionState::Stopping;
        self.shutdown(false);
        self.state = SessionState::Failed;
        if was_streaming {
            self.emit(CoreEvent::RecordingStop {});
        }
        self.emit(CoreEvent::Error {
            message: message.to_string(),
        });
        self.emit_status(StatusStage::Error);
    }

    /// Release owned resources, capture first so no PCM is queued on a
    /// transport that is about to close. `send_stop` is true only for a
    /// user-initiated stop on a socket we still believe is open.
    fn shutdown(&mut self, send_stop: bool) {
        if let Some(mut capture) = self.capture.take() {
            capture.close();
        }
        if let Some(transport) = self.transport.take() {
            if send_stop {
                transport.send_stop();
            }
            transport.close();
        }
    }
}

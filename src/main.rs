//! Scribe core — realtime microphone-to-transcript streaming process.
//!
//! A UI shell drives it over JSON-line IPC on stdin/stdout: the shell
//! issues commands (list devices, start/stop recording), the core
//! captures PCM at 16 kHz mono, streams it to the transcription backend
//! over a WebSocket, and emits status plus incremental transcript
//! events. This is the entry point holding the single-threaded
//! orchestration loop; all session state transitions happen here.

mod audio;
mod config;
mod error;
mod ipc;
mod session;
mod transport;

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use audio::capture::{self, BLOCK_CHANNEL_CAPACITY};
use audio::devices;
use audio::PcmBlock;
use config::{read_core_config, CoreConfig};
use error::CatalogError;
use ipc::bridge::{emit_event, spawn_stdin_reader};
use ipc::{CoreCommand, CoreEvent, StatusStage};
use session::{RecordingSession, SessionState};
use transport::{TransportEvent, WsTransport};

#[tokio::main]
async fn main() {
    // Initialize tracing (respects RUST_LOG env, defaults to info).
    // stderr only; stdout belongs to the event stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Emit starting event immediately so the shell knows we're alive.
    emit_event(&CoreEvent::Starting {});

    let config = read_core_config();
    info!(?config, "Configuration loaded");

    // Spawn stdin reader (blocking thread -> async channel).
    let mut cmd_rx = spawn_stdin_reader();

    // Long-lived channels. Capture and transport instances come and go
    // with sessions; stale traffic falls through the session's state and
    // connection checks.
    let (core_event_tx, mut core_event_rx) = mpsc::unbounded_channel::<CoreEvent>();
    let (transport_event_tx, mut transport_event_rx) = mpsc::unbounded_channel::<TransportEvent>();
    let (blocks_tx, mut blocks_rx) = mpsc::channel::<PcmBlock>(BLOCK_CHANNEL_CAPACITY);
    let (capture_error_tx, mut capture_error_rx) = mpsc::unbounded_channel::<String>();

    // At most one live session; terminal sessions stay in the slot,
    // inert, until the next start replaces them.
    let mut session: Option<RecordingSession> = None;

    emit_event(&CoreEvent::Ready {});
    info!("Scribe core ready");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(CoreCommand::Ping {}) => {
                        emit_event(&CoreEvent::Pong {});
                    }
                    Some(CoreCommand::Stop {}) => {
                        emit_event(&CoreEvent::Stopping {});
                        break;
                    }
                    Some(CoreCommand::ListDevices {}) => {
                        list_devices();
                    }
                    Some(CoreCommand::StartRecording { device_id }) => {
                        start_recording(
                            device_id,
                            &config,
                            &mut session,
                            &core_event_tx,
                            &transport_event_tx,
                            &blocks_tx,
                            &mut blocks_rx,
                            &capture_error_tx,
                            &mut capture_error_rx,
                        )
                        .await;
                    }
                    Some(CoreCommand::StopRecording {}) => {
                        if let Some(session) = session.as_mut() {
                            session.stop();
                        }
                    }
                    None => {
                        // stdin closed, shell process gone.
                        info!("stdin closed, shutting down");
                        break;
                    }
                }
            }
            Some(event) = transport_event_rx.recv() => {
                if let Some(session) = session.as_mut() {
                    session.on_transport_event(event);
                }
            }
            Some(block) = blocks_rx.recv() => {
                if let Some(session) = session.as_mut() {
                    session.on_block(block);
                }
            }
            Some(message) = capture_error_rx.recv() => {
                if let Some(session) = session.as_mut() {
                    session.on_capture_error(&message);
                }
            }
            Some(event) = core_event_rx.recv() => {
                emit_event(&event);
            }
        }
    }

    // Release the microphone and socket if a session is still live.
    if let Some(mut session) = session.take() {
        session.stop();
    }
    while let Ok(event) = core_event_rx.try_recv() {
        emit_event(&event);
    }
    info!("Scribe core shutting down");
}

/// Enumerate capture devices for the shell's device picker.
fn list_devices() {
    emit_event(&CoreEvent::Status {
        stage: StatusStage::RequestingPermission,
    });
    match devices::list_input_devices() {
        Ok(input) => {
            let default_index = devices::default_index(&input);
            emit_event(&CoreEvent::Devices {
                input,
                default_index,
            });
        }
        Err(e @ CatalogError::PermissionDenied(_)) => {
            warn!("{}", e);
            emit_event(&CoreEvent::Error {
                message: e.to_string(),
            });
            emit_event(&CoreEvent::Status {
                stage: StatusStage::Error,
            });
        }
        Err(e) => {
            // Enumeration failure degrades to an empty list; the shell
            // can still start with the platform default and retry later.
            warn!("{}", e);
            emit_event(&CoreEvent::Devices {
                input: Vec::new(),
                default_index: 0,
            });
        }
    }
}

/// Drive one session from Idle to Streaming. The async edges (socket
/// connect, capture open) run inline in the orchestration loop, so a
/// second start cannot interleave with an in-flight one.
#[allow(clippy::too_many_arguments)]
async fn start_recording(
    device_id: Option<String>,
    config: &CoreConfig,
    slot: &mut Option<RecordingSession>,
    core_events: &mpsc::UnboundedSender<CoreEvent>,
    transport_events: &mpsc::UnboundedSender<TransportEvent>,
    blocks_tx: &mpsc::Sender<PcmBlock>,
    blocks_rx: &mut mpsc::Receiver<PcmBlock>,
    capture_errors: &mpsc::UnboundedSender<String>,
    capture_error_rx: &mut mpsc::UnboundedReceiver<String>,
) {
    if let Some(existing) = slot.as_ref() {
        if !existing.is_terminal() {
            // In flight or already streaming. The shell gates its
            // button, so this is a silent no-op, never a second session.
            return;
        }
    }

    let mut session = RecordingSession::new(core_events.clone());
    session.begin();

    let endpoint = config.audio_endpoint();
    match WsTransport::connect(&endpoint, transport_events.clone()).await {
        Ok(link) => session.on_transport_open(Box::new(link)),
        Err(e) => session.on_connect_failed(&e.to_string()),
    }

    if session.state() == SessionState::AwaitingCapture {
        // Leftovers from a previous capture must not leak into this
        // stream. The old capture thread is already joined, so draining
        // here empties the channels for good.
        while blocks_rx.try_recv().is_ok() {}
        while capture_error_rx.try_recv().is_ok() {}

        // Explicit device wins, then the configured preference; an
        // absent or empty id lets the platform default apply (distinct
        // from the catalog's inferred default, which is only a UI hint).
        let preferred = device_id
            .or_else(|| config.device_id.clone())
            .filter(|id| !id.is_empty());
        match capture::open(preferred.as_deref(), blocks_tx.clone(), capture_errors.clone()).await
        {
            Ok(handle) => session.on_capture_open(Box::new(handle)),
            Err(e) => session.on_capture_failed(&e),
        }
    }

    *slot = Some(session);
}

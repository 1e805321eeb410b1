//! IPC protocol types for the UI shell.
//!
//! Events use `{"event": "<name>", "data": {...}}` format (core -> shell).
//! Commands use `{"command": "<name>", ...}` format (shell -> core).

pub mod bridge;

use serde::{Deserialize, Serialize};

use crate::audio::devices::AudioDevice;

/// Pipeline status stages the shell renders. Exact wording is the
/// shell's concern; the core only names the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusStage {
    RequestingPermission,
    Connecting,
    RequestingDevice,
    Streaming,
    Stopped,
    Error,
}

/// All events emitted to the shell via stdout as JSON lines.
///
/// Serialized as `{"event": "<variant>", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum CoreEvent {
    Starting {},
    Ready {},
    Status {
        stage: StatusStage,
    },
    Devices {
        input: Vec<AudioDevice>,
        /// Catalog's inferred default, a preselect hint for the shell.
        #[serde(rename = "defaultIndex")]
        default_index: usize,
    },
    RecordingStart {},
    RecordingStop {},
    Transcript {
        text: String,
    },
    Error {
        message: String,
    },
    Pong {},
    Stopping {},
}

/// All commands received from the shell via stdin as JSON lines.
///
/// Deserialized from `{"command": "<variant>", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum CoreCommand {
    StartRecording {
        /// Explicit capture device; absent lets the platform default
        /// apply.
        #[serde(default, rename = "deviceId")]
        device_id: Option<String>,
    },
    StopRecording {},
    ListDevices {},
    Ping {},
    Stop {},
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_recording_parses_device_id() {
        let cmd: CoreCommand =
            serde_json::from_str(r#"{"command":"start_recording","deviceId":"usb-mic"}"#).unwrap();
        match cmd {
            CoreCommand::StartRecording { device_id } => {
                assert_eq!(device_id.as_deref(), Some("usb-mic"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn start_recording_device_id_is_optional() {
        let cmd: CoreCommand = serde_json::from_str(r#"{"command":"start_recording"}"#).unwrap();
        assert!(matches!(
            cmd,
            CoreCommand::StartRecording { device_id: None }
        ));
    }

    #[test]
    fn bare_commands_parse() {
        assert!(matches!(
            serde_json::from_str(r#"{"command":"stop_recording"}"#).unwrap(),
            CoreCommand::StopRecording {}
        ));
        assert!(matches!(
            serde_json::from_str(r#"{"command":"ping"}"#).unwrap(),
            CoreCommand::Ping {}
        ));
    }

    #[test]
    fn status_event_serializes_kebab_case_stage() {
        let json = serde_json::to_string(&CoreEvent::Status {
            stage: StatusStage::RequestingPermission,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"status","data":{"stage":"requesting-permission"}}"#
        );
    }

    #[test]
    fn transcript_event_shape() {
        let json = serde_json::to_string(&CoreEvent::Transcript {
            text: "hello".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"transcript","data":{"text":"hello"}}"#);
    }
}

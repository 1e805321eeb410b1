//! Error taxonomy for the capture-and-streaming pipeline.
//!
//! Each layer surfaces its own small set of failures; the session state
//! machine decides what is fatal to the attempted recording.

use thiserror::Error;

/// Device catalog failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The host refused capture access (denied or blocked microphone).
    /// Fatal to the attempted session; recovery is a fresh user retry.
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),

    /// Device enumeration itself failed. Callers degrade the device
    /// list to empty instead of blocking a retry.
    #[error("device enumeration failed: {0}")]
    Access(String),
}

/// Capture session failures. Both are fatal to the attempted session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The requested exact device is missing or cannot be opened.
    /// Never silently falls back to another device.
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The capture stream could not be built or started.
    #[error("capture stream init failed: {0}")]
    ProcessingInit(String),
}

/// Socket-level transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket connect failed: {0}")]
    Connect(String),
}

/// One malformed inbound frame. Isolated to that message; the transport
/// keeps processing subsequent frames.
#[derive(Debug, Error)]
#[error("malformed transcript frame: {0}")]
pub struct DecodeError(pub String);

//! Input device catalog.
//!
//! Enumerates capture devices in host-reported order and infers which
//! entry a UI should preselect. Labels and usable ids require capture
//! access, so enumeration starts with a capability probe.

use cpal::traits::{DeviceTrait, HostTrait};
use serde::Serialize;
use tracing::warn;

use crate::error::CatalogError;

/// Immutable snapshot of one capture device. Ids have no identity across
/// enumerations beyond string equality.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDevice {
    /// Opaque device id. cpal exposes no stable id separate from the
    /// name, so the name doubles as the id.
    pub id: String,
    pub label: String,
    pub is_default_candidate: bool,
}

/// Reserved id some hosts report for the system default input.
const DEFAULT_SENTINEL: &str = "default";

fn is_default_candidate(id: &str, label: &str) -> bool {
    let label = label.to_lowercase();
    id == DEFAULT_SENTINEL || label.contains("default") || label.contains("communication")
}

/// Index a UI should preselect: the first qualifying entry in
/// enumeration order, index 0 when nothing qualifies. First match wins,
/// this is not a ranking.
pub fn default_index(devices: &[AudioDevice]) -> usize {
    devices
        .iter()
        .position(|d| d.is_default_candidate)
        .unwrap_or(0)
}

/// Probe capture access before enumerating. Hosts surface a denied or
/// blocked microphone as an unusable default input, so asking for its
/// input config doubles as the permission check.
fn probe_capture_access(host: &cpal::Host) -> Result<(), CatalogError> {
    let device = host
        .default_input_device()
        .ok_or_else(|| CatalogError::PermissionDenied("no usable input device".into()))?;
    device
        .default_input_config()
        .map_err(|e| CatalogError::PermissionDenied(e.to_string()))?;
    Ok(())
}

/// Enumerate capture devices, preserving the host's order.
pub fn list_input_devices() -> Result<Vec<AudioDevice>, CatalogError> {
    let host = cpal::default_host();
    probe_capture_access(&host)?;

    let devices = host
        .input_devices()
        .map_err(|e| CatalogError::Access(e.to_string()))?;

    let mut out = Vec::new();
    for device in devices {
        let name = match device.name() {
            Ok(name) => name,
            Err(e) => {
                warn!("Skipping unnamed input device: {}", e);
                continue;
            }
        };
        let candidate = is_default_candidate(&name, &name);
        out.push(AudioDevice {
            id: name.clone(),
            label: name,
            is_default_candidate: candidate,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: &str, label: &str) -> AudioDevice {
        AudioDevice {
            id: id.to_string(),
            label: label.to_string(),
            is_default_candidate: is_default_candidate(id, label),
        }
    }

    #[test]
    fn sentinel_id_wins_regardless_of_position() {
        let devices = vec![
            dev("usb-0", "USB Microphone"),
            dev("hw:1", "Webcam Mic"),
            dev("default", "Built-in Audio"),
        ];
        assert_eq!(default_index(&devices), 2);
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let devices = vec![
            dev("usb-0", "USB Microphone"),
            dev("hw:2", "Default - Microphone Array"),
        ];
        assert_eq!(default_index(&devices), 1);
    }

    #[test]
    fn communications_label_qualifies() {
        let devices = vec![
            dev("usb-0", "USB Microphone"),
            dev("hw:3", "Communications Headset"),
            dev("default", "Built-in Audio"),
        ];
        // First match wins, not the strongest match.
        assert_eq!(default_index(&devices), 1);
    }

    #[test]
    fn falls_back_to_index_zero() {
        let devices = vec![dev("usb-0", "USB Microphone"), dev("hw:1", "Webcam Mic")];
        assert_eq!(default_index(&devices), 0);
    }
}

//! Configuration reading and endpoint derivation.

pub mod paths;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use paths::get_data_dir;

/// Backend host used when the config file is absent.
const DEFAULT_HOST: &str = "127.0.0.1:8000";

/// scribe_config.json shape (written by the shell's settings panel).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Backend `host[:port]`, no scheme.
    #[serde(default)]
    pub server_host: Option<String>,
    /// Secure shell page means secure socket (wss).
    #[serde(default)]
    pub secure: bool,
    /// Preferred capture device id; absent means platform default.
    #[serde(default)]
    pub device_id: Option<String>,
}

impl CoreConfig {
    /// Audio socket endpoint, scheme matching the hosting shell.
    pub fn audio_endpoint(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let host = self.server_host.as_deref().unwrap_or(DEFAULT_HOST);
        format!("{}://{}/ws/audio", scheme, host)
    }
}

/// Read scribe_config.json from the data directory.
pub fn read_core_config() -> CoreConfig {
    read_json_file(&get_config_path()).unwrap_or_default()
}

/// Path to scribe_config.json.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("scribe_config.json")
}

/// Generic helper: read a JSON file and deserialize it.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), e);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_plain_ws() {
        let config = CoreConfig::default();
        assert_eq!(config.audio_endpoint(), "ws://127.0.0.1:8000/ws/audio");
    }

    #[test]
    fn secure_flag_selects_wss() {
        let config = CoreConfig {
            server_host: Some("transcribe.example.com".into()),
            secure: true,
            device_id: None,
        };
        assert_eq!(
            config.audio_endpoint(),
            "wss://transcribe.example.com/ws/audio"
        );
    }

    #[test]
    fn parses_camel_case_fields() {
        let config: CoreConfig = serde_json::from_str(
            r#"{"serverHost":"10.0.0.2:9000","secure":false,"deviceId":"default"}"#,
        )
        .unwrap();
        assert_eq!(config.server_host.as_deref(), Some("10.0.0.2:9000"));
        assert_eq!(config.device_id.as_deref(), Some("default"));
        assert_eq!(config.audio_endpoint(), "ws://10.0.0.2:9000/ws/audio");
    }
}

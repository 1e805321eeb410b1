//! Platform-specific data directory paths.
//!
//!   Windows: %APPDATA%/scribe-core
//!   macOS:   ~/Library/Application Support/scribe-core
//!   Linux:   $XDG_CONFIG_HOME/scribe-core (default ~/.config)

use std::path::PathBuf;

/// Data directory holding the config file (cross-platform).
pub fn get_data_dir() -> PathBuf {
    get_config_base().join("scribe-core")
}

fn get_config_base() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata);
        }
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library")
            .join("Application Support")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // Respect XDG_CONFIG_HOME, default ~/.config.
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    }
}

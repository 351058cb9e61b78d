//! Policy and run-mode configuration persistence
//!
//! A single `config.json` in the XDG data directory. Every field has a
//! serde default, so a partial or missing file behaves like the shipped
//! defaults. The file is materialized on first run so operators can see
//! which knobs exist.

use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Sweep configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Administrative port exempted from cleanup
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,
    /// Ports that should never be open to anywhere; matching rules are
    /// reported with a warning (and still deleted)
    #[serde(default = "default_flagged_ports")]
    pub flagged_ports: Vec<u16>,
    /// Interval used when --watch is given without a value
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_port: default_admin_port(),
            flagged_ports: default_flagged_ports(),
            watch_interval_secs: default_watch_interval(),
        }
    }
}

fn default_admin_port() -> u16 {
    22
}

fn default_flagged_ports() -> Vec<u16> {
    // telnet, msrpc, netbios, smb, rdp
    vec![23, 135, 139, 445, 3389]
}

fn default_watch_interval() -> u64 {
    5
}

fn config_path() -> Option<PathBuf> {
    get_data_dir().map(|mut path| {
        path.push("config.json");
        path
    })
}

/// Saves the config to disk using an atomic write pattern.
/// 1. Writes to a temporary file.
/// 2. Sets restrictive permissions (0o600).
/// 3. Atomically renames to the target path.
///
/// # Errors
///
/// Returns `Err` if the data directory is unavailable or the write fails.
pub async fn save_config(config: &AppConfig) -> std::io::Result<()> {
    if let Some(mut path) = get_data_dir() {
        let json = serde_json::to_string_pretty(config)?;

        let mut temp_path = path.clone();
        temp_path.push("config.json.tmp");

        path.push("config.json");

        #[cfg(unix)]
        {
            use tokio::fs::OpenOptions;
            use tokio::io::AsyncWriteExt;

            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .mode(0o600) // Set permissions BEFORE any data is written
                .open(&temp_path)
                .await?;

            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
        }

        #[cfg(not(unix))]
        {
            use tokio::io::AsyncWriteExt;

            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
        }

        // Atomic rename
        tokio::fs::rename(temp_path, path).await?;
    }
    Ok(())
}

/// Loads the config from disk, or returns defaults if not found or invalid.
pub async fn load_config() -> AppConfig {
    if let Some(path) = config_path()
        && let Ok(json) = tokio::fs::read_to_string(&path).await
        && let Ok(config) = serde_json::from_str::<AppConfig>(&json)
    {
        return config;
    }
    AppConfig::default()
}

/// Loads the config, writing the defaults to disk first if no file exists.
pub async fn load_or_init() -> AppConfig {
    if let Some(path) = config_path()
        && !path.exists()
    {
        let config = AppConfig::default();
        match save_config(&config).await {
            Ok(()) => info!("wrote default configuration to {}", path.display()),
            Err(e) => warn!("failed to write default configuration: {e}"),
        }
        return config;
    }
    load_config().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.admin_port, 22);
        assert!(config.flagged_ports.contains(&3389));
        assert_eq!(config.watch_interval_secs, 5);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"admin_port": 2222}"#).unwrap();
        assert_eq!(config.admin_port, 2222);
        assert_eq!(config.flagged_ports, AppConfig::default().flagged_ports);
        assert_eq!(config.watch_interval_secs, 5);
    }

    #[test]
    fn test_empty_object_is_all_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_round_trip() {
        let config = AppConfig {
            admin_port: 2200,
            flagged_ports: vec![23],
            watch_interval_secs: 0,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

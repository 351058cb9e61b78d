//! Utility functions for directory management
//!
//! This module provides helper functions following the XDG Base Directory
//! specification for portable configuration and state storage across Linux
//! distributions.
//!
//! # Directory Structure
//!
//! - Data: `~/.local/share/ufw-sweep/` - Configuration file
//! - State: `~/.local/state/ufw-sweep/` - Runtime state (audit log)
//!
//! Note that after privilege elevation these resolve under root's home, so
//! elevated runs share one configuration and one audit trail.

use directories::ProjectDirs;
use std::path::PathBuf;

pub fn get_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "ufw-sweep", "ufw-sweep").map(|pd| pd.data_dir().to_path_buf())
}

pub fn get_state_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "ufw-sweep", "ufw-sweep")
        .and_then(|pd| pd.state_dir().map(std::path::Path::to_path_buf))
}

pub fn ensure_dirs() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        let mut builder = DirBuilder::new();
        builder.mode(0o700); // User read/write/execute only
        builder.recursive(true);

        if let Some(dir) = get_data_dir() {
            builder.create(dir)?;
        }
        if let Some(dir) = get_state_dir() {
            builder.create(dir)?;
        }
    }

    #[cfg(not(unix))]
    {
        if let Some(dir) = get_data_dir() {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(dir) = get_state_dir() {
            std::fs::create_dir_all(dir)?;
        }
    }

    Ok(())
}

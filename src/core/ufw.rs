//! Invocation of the external `ufw` tool
//!
//! The live rule table is owned entirely by ufw; this module is the
//! request/response boundary to it. Exactly two operations are needed:
//! listing the numbered rules and deleting one rule by index. Both are
//! synchronous in effect: the caller awaits full completion before issuing
//! the next call, so there is never more than one ufw child at a time.
//!
//! # Executable resolution
//!
//! The binary is located by, in order:
//!
//! 1. the `UFW_SWEEP_UFW_COMMAND` environment variable (also the hook the
//!    test suite uses to substitute a mock),
//! 2. the compile-time packager override `UFW_SWEEP_SYSTEM_UFW_PATH`,
//! 3. a `$PATH` search,
//! 4. the conventional sbin locations `/usr/sbin`, `/sbin`, `/usr/local/sbin`
//!    (ufw installs outside the default user PATH on most distros).
//!
//! Failure to locate the tool is fatal for the whole run.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error, info};

/// Environment variable overriding the ufw executable path
pub const ENV_UFW_COMMAND: &str = "UFW_SWEEP_UFW_COMMAND";

const FALLBACK_DIRS: [&str; 3] = ["/usr/sbin", "/sbin", "/usr/local/sbin"];

/// Handle to a resolved ufw executable
#[derive(Debug, Clone)]
pub struct Ufw {
    binary: PathBuf,
}

impl Ufw {
    /// Locates the ufw executable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if no candidate resolves to an
    /// existing file. An explicit `UFW_SWEEP_UFW_COMMAND` pointing at a
    /// missing file is fatal rather than silently falling through.
    pub fn locate() -> Result<Self> {
        if let Some(override_path) = std::env::var_os(ENV_UFW_COMMAND) {
            let path = PathBuf::from(override_path);
            if path.is_file() {
                debug!(path = %path.display(), "using ufw override from environment");
                return Ok(Self { binary: path });
            }
            error!(path = %path.display(), "ufw override does not exist");
            return Err(Error::ToolNotFound);
        }

        if let Some(system_path) = option_env!("UFW_SWEEP_SYSTEM_UFW_PATH") {
            let path = Path::new(system_path);
            if path.is_file() {
                return Ok(Self {
                    binary: path.to_path_buf(),
                });
            }
        }

        if let Some(path) = search_path("ufw") {
            return Ok(Self { binary: path });
        }

        for dir in FALLBACK_DIRS {
            let path = Path::new(dir).join("ufw");
            if path.is_file() {
                return Ok(Self { binary: path });
            }
        }

        Err(Error::ToolNotFound)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Runs `ufw status numbered` and returns the raw listing text.
    ///
    /// # Errors
    ///
    /// A non-zero exit from the listing query aborts the whole run: without
    /// a trustworthy snapshot there is nothing safe to do.
    pub async fn status_numbered(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(["status", "numbered"])
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(exit_code = ?output.status.code(), "'ufw status numbered' failed: {stderr}");
            Err(Error::Ufw {
                message: format!("failed to query the rule listing: {}", stderr.trim()),
                stderr: Some(stderr),
                exit_code: output.status.code(),
            })
        }
    }

    /// Deletes a single rule by its current index via `ufw --force delete`.
    ///
    /// `--force` suppresses ufw's own confirmation prompt; the sweep handles
    /// operator confirmation itself, once per plan rather than per rule.
    ///
    /// # Errors
    ///
    /// A non-zero exit is returned to the caller, which treats it as a
    /// per-item failure and continues with the rest of the plan.
    pub async fn delete_rule(&self, index: u32) -> Result<()> {
        let output = Command::new(&self.binary)
            .args(["--force", "delete"])
            .arg(index.to_string())
            .output()
            .await?;

        if output.status.success() {
            info!(index, "rule deleted");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(Error::Ufw {
                message: format!("delete of rule {index} failed: {}", stderr.trim()),
                stderr: Some(stderr),
                exit_code: output.status.code(),
            })
        }
    }
}

/// Searches `$PATH` for an executable with the given name
fn search_path(name: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::ENV_VAR_MUTEX;

    #[test]
    fn test_search_path_finds_sh() {
        // sh exists on all Unix systems
        assert!(search_path("sh").is_some());
        assert!(search_path("ufw_sweep_nonexistent_binary_xyz").is_none());
    }

    #[test]
    fn test_locate_with_env_override() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();

        let sh = search_path("sh").unwrap();
        unsafe {
            std::env::set_var(ENV_UFW_COMMAND, &sh);
        }

        let ufw = Ufw::locate().unwrap();
        assert_eq!(ufw.binary(), sh.as_path());

        unsafe {
            std::env::remove_var(ENV_UFW_COMMAND);
        }
    }

    #[test]
    fn test_locate_with_missing_override_is_fatal() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();

        unsafe {
            std::env::set_var(ENV_UFW_COMMAND, "/nonexistent/ufw");
        }

        let result = Ufw::locate();

        unsafe {
            std::env::remove_var(ENV_UFW_COMMAND);
        }

        assert!(matches!(result, Err(Error::ToolNotFound)));
    }
}

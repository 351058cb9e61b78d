//! Privilege elevation at startup
//!
//! Querying and mutating ufw state requires root. Instead of elevating
//! per-command, the whole process elevates exactly once, before touching the
//! firewall: if the effective UID is not root, the process image is replaced
//! with an elevated re-invocation of itself, preserving all original
//! arguments. If no elevation mechanism is available, the run fails with a
//! clear message.
//!
//! # Elevation Strategy
//!
//! - **Preferred**: `run0` when available (systemd v256+, no SUID)
//! - **Fallback**: `sudo`
//!
//! # Environment Variables
//!
//! - `UFW_SWEEP_ELEVATION_METHOD`: Force a specific elevation method
//!   (`sudo` or `run0`). Useful for scripts with sudoers NOPASSWD rules.
//!
//! - `UFW_SWEEP_NO_ELEVATION`: Bypass elevation entirely (for testing only).
//!
//! # Security
//!
//! The re-exec passes the resolved current executable path and the original
//! argument vector directly, without shell interpolation.

use std::io;

/// Environment variable that bypasses elevation (tests only)
pub const ENV_NO_ELEVATION: &str = "UFW_SWEEP_NO_ELEVATION";

/// Environment variable forcing a specific elevation method
pub const ENV_ELEVATION_METHOD: &str = "UFW_SWEEP_ELEVATION_METHOD";

/// Error type for privilege elevation operations
#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    /// Neither run0 nor sudo is available
    #[error("no elevation mechanism found - run as root, or install sudo or run0")]
    NoMechanism,

    /// Requested elevation method is not available (binary not found)
    #[error("elevation method '{0}' is not available (binary not found)")]
    MethodNotAvailable(String),

    /// Invalid value for `UFW_SWEEP_ELEVATION_METHOD`
    #[error("invalid UFW_SWEEP_ELEVATION_METHOD '{0}'. Valid options: sudo, run0")]
    InvalidMethod(String),

    /// The replacement exec itself failed
    #[error("failed to re-execute under {mechanism}: {source}")]
    ExecFailed {
        mechanism: String,
        #[source]
        source: io::Error,
    },
}

/// Checks if a binary exists in PATH
///
/// # Arguments
///
/// * `name` - Binary name to search for (e.g., "sudo", "run0")
fn binary_exists(name: &str) -> bool {
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths).find_map(|dir| {
                let full_path = dir.join(name);
                if full_path.is_file() {
                    Some(full_path)
                } else {
                    None
                }
            })
        })
        .is_some()
}

/// Elevate-or-fail step, run once at startup.
///
/// Returns `Ok(())` when already running as root (or when bypassed for
/// tests). Otherwise the process image is replaced by an elevated
/// re-invocation and this function does not return; every `Err` therefore
/// means elevation is unavailable or the exec failed.
///
/// # Errors
///
/// See [`ElevationError`].
pub fn ensure_root() -> Result<(), ElevationError> {
    if std::env::var_os(ENV_NO_ELEVATION).is_some() {
        return Ok(());
    }

    if nix::unistd::geteuid().is_root() {
        return Ok(());
    }

    let mechanism = select_mechanism()?;
    eprintln!("Elevating privileges with {mechanism}...");
    Err(reexec(&mechanism))
}

/// Picks the elevation mechanism: explicit override first, then run0,
/// then sudo.
fn select_mechanism() -> Result<String, ElevationError> {
    if let Ok(method) = std::env::var(ENV_ELEVATION_METHOD) {
        let method = method.to_lowercase();
        if !method.is_empty() {
            return match method.as_str() {
                "sudo" | "run0" => {
                    if binary_exists(&method) {
                        Ok(method)
                    } else {
                        Err(ElevationError::MethodNotAvailable(method))
                    }
                }
                _ => Err(ElevationError::InvalidMethod(method)),
            };
        }
    }

    if binary_exists("run0") {
        return Ok("run0".to_string());
    }
    if binary_exists("sudo") {
        return Ok("sudo".to_string());
    }
    Err(ElevationError::NoMechanism)
}

/// Replaces the current process image with `<mechanism> <self> <args...>`.
/// Only returns on failure.
fn reexec(mechanism: &str) -> ElevationError {
    use std::os::unix::process::CommandExt;

    let exe = match std::env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            return ElevationError::ExecFailed {
                mechanism: mechanism.to_string(),
                source: e,
            };
        }
    };

    let err = std::process::Command::new(mechanism)
        .arg(exe)
        .args(std::env::args_os().skip(1))
        .exec();

    ElevationError::ExecFailed {
        mechanism: mechanism.to_string(),
        source: err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::ENV_VAR_MUTEX;

    #[test]
    fn test_binary_exists() {
        // sh should exist on all Unix systems
        assert!(binary_exists("sh"));
        // This should not exist
        assert!(!binary_exists("ufw_sweep_nonexistent_binary_xyz"));
    }

    #[test]
    fn test_bypass_env_skips_elevation() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();

        unsafe {
            std::env::set_var(ENV_NO_ELEVATION, "1");
        }

        let result = ensure_root();

        unsafe {
            std::env::remove_var(ENV_NO_ELEVATION);
        }

        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_elevation_method() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();

        unsafe {
            std::env::set_var(ENV_ELEVATION_METHOD, "invalid_method");
        }

        let result = select_mechanism();

        unsafe {
            std::env::remove_var(ENV_ELEVATION_METHOD);
        }

        assert!(matches!(result, Err(ElevationError::InvalidMethod(_))));
    }

    #[test]
    fn test_elevation_method_case_insensitive() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();

        unsafe {
            std::env::set_var(ENV_ELEVATION_METHOD, "SUDO");
        }

        let result = select_mechanism();

        unsafe {
            std::env::remove_var(ENV_ELEVATION_METHOD);
        }

        // Should succeed (sudo exists) or fail with MethodNotAvailable
        // (sudo doesn't exist) but NOT InvalidMethod
        assert!(!matches!(result, Err(ElevationError::InvalidMethod(_))));
    }
}

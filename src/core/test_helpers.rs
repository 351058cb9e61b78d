//! Shared test utilities for core module tests
//!
//! Provides common test helpers to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::core::rule::{Action, Direction, Rule};
use std::sync::Mutex;

/// Mutex for tests that need exclusive access to environment variables.
///
/// Process environment is global state; tests that set or remove variables
/// (`UFW_SWEEP_UFW_COMMAND`, `UFW_SWEEP_ELEVATION_METHOD`, ...) must hold
/// this guard so parallel test threads cannot observe each other's values.
///
/// # Example
///
/// ```ignore
/// let _guard = ENV_VAR_MUTEX.lock().unwrap();
/// unsafe {
///     std::env::set_var("UFW_SWEEP_ELEVATION_METHOD", "sudo");
/// }
/// // ... test with custom env state ...
/// unsafe {
///     std::env::remove_var("UFW_SWEEP_ELEVATION_METHOD");
/// }
/// ```
pub static ENV_VAR_MUTEX: Mutex<()> = Mutex::new(());

/// Builds a rule record without going through the parser.
pub fn rule(index: u32, destination: &str, action: Action, direction: Direction, source: &str) -> Rule {
    Rule {
        index,
        destination: destination.to_string(),
        action,
        direction,
        source: source.to_string(),
    }
}

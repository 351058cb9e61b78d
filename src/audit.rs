/// Audit logging for destructive operations
///
/// This module provides structured logging of every mutation the sweep
/// performs against the live rule table: computed plans, per-index
/// deletions, and declined confirmations.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Types of auditable events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PlanComputed,
    DeleteRule,
    Declined,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Type of event
    pub event_type: EventType,

    /// Whether the operation succeeded
    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    /// Creates a new audit event
    pub fn new(
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }
}

/// Audit log writer
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Creates a new audit log instance
    ///
    /// # Errors
    ///
    /// Returns `Err` if state directory cannot be determined
    pub fn new() -> std::io::Result<Self> {
        let mut log_path = crate::utils::get_state_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "State directory not found")
        })?;
        log_path.push("audit.log");

        Ok(Self { log_path })
    }

    /// Appends an event to the audit log
    ///
    /// Events are written as JSON-lines format (one JSON object per line)
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be opened or written
    pub async fn log(&self, event: AuditEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(&event)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;

        Ok(())
    }

    /// Reads the most recent events from the log
    ///
    /// # Arguments
    ///
    /// * `count` - Maximum number of events to return
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be read
    #[allow(dead_code)]
    pub async fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = tokio::fs::read_to_string(&self.log_path).await?;

        let events: Vec<AuditEvent> = content
            .lines()
            .rev()
            .take(count)
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        Ok(events)
    }

    /// Returns the path to the audit log file
    #[allow(dead_code)]
    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

/// Logs a computed deletion plan
///
/// # Arguments
///
/// * `planned` - Number of rules scheduled for deletion
/// * `dry_run` - Whether the plan will actually be applied
pub async fn log_plan(planned: usize, dry_run: bool) {
    if let Ok(audit) = AuditLog::new() {
        let event = AuditEvent::new(
            EventType::PlanComputed,
            true,
            serde_json::json!({
                "planned": planned,
                "dry_run": dry_run,
            }),
            None,
        );

        if let Err(e) = audit.log(event).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }
}

/// Logs one deletion attempt
pub async fn log_delete(index: u32, success: bool, error: Option<String>) {
    if let Ok(audit) = AuditLog::new() {
        let event = AuditEvent::new(
            EventType::DeleteRule,
            success,
            serde_json::json!({
                "index": index,
            }),
            error,
        );

        if let Err(e) = audit.log(event).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }
}

/// Logs a declined confirmation prompt
pub async fn log_declined(planned: usize) {
    if let Ok(audit) = AuditLog::new() {
        let event = AuditEvent::new(
            EventType::Declined,
            true,
            serde_json::json!({
                "planned": planned,
            }),
            None,
        );

        if let Err(e) = audit.log(event).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_audit_event_creation() {
        let event = AuditEvent::new(
            EventType::PlanComputed,
            true,
            serde_json::json!({"planned": 3}),
            None,
        );

        assert!(event.success);
        assert!(event.error.is_none());
        assert_eq!(event.details["planned"], 3);
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new(
            EventType::DeleteRule,
            false,
            serde_json::json!({"index": 7}),
            Some("non-existent rule".to_string()),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("delete_rule"));
        assert!(json.contains("non-existent rule"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"timestamp":"2024-01-01T00:00:00Z","event_type":"declined","success":true,"details":{"planned":2},"error":null}"#;
        let event: AuditEvent = serde_json::from_str(json).unwrap();

        assert!(event.success);
        assert!(matches!(event.event_type, EventType::Declined));
    }
}

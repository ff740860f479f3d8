use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One entry in the admin audit trail: emitted for every mutating admin
/// call, mirroring the teacher's compliance audit log but scoped to
/// control-plane mutations (there is no per-request data-plane traffic in
/// this process).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub outcome: AuditOutcome,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditEntry {
    pub fn success(operation: &str, entity_kind: &str, entity_id: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            entity_kind: entity_kind.to_string(),
            entity_id: entity_id.to_string(),
            outcome: AuditOutcome::Success,
            error: None,
        }
    }

    pub fn failure(operation: &str, entity_kind: &str, entity_id: &str, error: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            entity_kind: entity_kind.to_string(),
            entity_id: entity_id.to_string(),
            outcome: AuditOutcome::Failure,
            error: Some(error.to_string()),
        }
    }

    /// Emits this entry as a structured `tracing` event. The audit trail
    /// is a log stream, not a separate persisted store: it rides on the
    /// same `tracing` pipeline the rest of the control plane uses.
    pub fn emit(&self) {
        info!(
            target: "audit",
            operation = %self.operation,
            entity_kind = %self.entity_kind,
            entity_id = %self.entity_id,
            outcome = ?self.outcome,
            error = self.error.as_deref().unwrap_or(""),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_entry_has_no_error() {
        let entry = AuditEntry::success("create", "gateway", "g1");
        assert_eq!(entry.outcome, AuditOutcome::Success);
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_failure_entry_carries_error() {
        let entry = AuditEntry::failure("delete", "listener", "l1", "has children");
        assert_eq!(entry.outcome, AuditOutcome::Failure);
        assert_eq!(entry.error.as_deref(), Some("has children"));
    }
}

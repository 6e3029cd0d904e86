//! Audit session lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::baseline::SnapshotVersion;
use crate::core::errors::{AuditError, Result};

/// Lifecycle state of an audit session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepted, baseline pinned, no claim processed yet
    Created,
    /// Claims are being processed
    Running,
    /// Every claim reached a terminal outcome
    Complete,
    /// Stopped by a session-level failure or cancellation
    Aborted,
}

impl SessionStatus {
    /// Lowercase label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
        }
    }

    /// No further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Created, Self::Aborted)
                | (Self::Running, Self::Complete)
                | (Self::Running, Self::Aborted)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batch submission processed against a single pinned baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSession {
    /// Session identifier
    pub id: Uuid,
    /// Baseline version pinned for the session's lifetime
    pub baseline_version: SnapshotVersion,
    /// Anomaly model version, absent in rule-only mode
    pub model_version: Option<String>,
    /// Business claim ids submitted with the batch (unknown ids omitted)
    pub claim_ids: Vec<String>,
    /// Current state
    pub status: SessionStatus,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Time the session reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    /// Session-level warnings such as degraded scoring
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Why the session aborted
    pub abort_reason: Option<String>,
}

impl AuditSession {
    /// New session in the `created` state
    pub fn new(baseline_version: SnapshotVersion, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            baseline_version,
            model_version: None,
            claim_ids: Vec::new(),
            status: SessionStatus::Created,
            created_at,
            finished_at: None,
            warnings: Vec::new(),
            abort_reason: None,
        }
    }

    /// Move to another state, rejecting illegal transitions
    pub fn transition(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AuditError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Abort with a reason
    pub fn abort(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(SessionStatus::Aborted)?;
        self.abort_reason = Some(reason.into());
        Ok(())
    }

    /// Record a session-level warning
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Aborted sessions keep their committed results but are incomplete
    pub fn is_incomplete(&self) -> bool {
        self.status == SessionStatus::Aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuditSession {
        AuditSession::new(SnapshotVersion(1), Utc::now())
    }

    #[test]
    fn happy_path_transitions() {
        let mut session = session();
        assert_eq!(session.status, SessionStatus::Created);
        session.transition(SessionStatus::Running).unwrap();
        session.transition(SessionStatus::Complete).unwrap();
        assert!(session.status.is_terminal());
        assert!(session.finished_at.is_some());
        assert!(!session.is_incomplete());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut session = session();
        session.transition(SessionStatus::Running).unwrap();
        session.abort("baseline retired").unwrap();
        assert!(session.is_incomplete());
        assert_eq!(session.abort_reason.as_deref(), Some("baseline retired"));

        let err = session.transition(SessionStatus::Running).unwrap_err();
        assert!(matches!(err, AuditError::InvalidTransition { .. }));
        assert!(session.transition(SessionStatus::Complete).is_err());
    }

    #[test]
    fn created_cannot_complete_directly() {
        let mut session = session();
        assert!(session.transition(SessionStatus::Complete).is_err());
        assert!(session.abort("config").is_ok());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Aborted).unwrap(),
            "\"aborted\""
        );
    }
}

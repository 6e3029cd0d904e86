//! Result persistence.
//!
//! Results are append-only. A commit stores one complete [`AuditResult`] or
//! nothing; readers never observe a partially written result.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::api::results::AuditResult;
use crate::core::errors::{AuditError, Result};

/// Storage collaborator for committed audit results
pub trait ResultStore: Send + Sync {
    /// Commit one complete result; a second result for the same session position is rejected
    fn commit(&self, result: AuditResult) -> Result<()>;

    /// Count a record rejected during normalization
    fn record_ingestion_failure(&self, session_id: Uuid, claim_id: Option<&str>);

    /// Results of a session ordered by batch position
    fn session_results(&self, session_id: Uuid) -> Vec<AuditResult>;

    /// Most recent result for a business claim id
    fn latest(&self, claim_id: &str) -> Option<AuditResult>;

    /// Every result ever committed for a business claim id, oldest first
    fn history(&self, claim_id: &str) -> Vec<AuditResult>;

    /// Most recent result of every claim
    fn latest_results(&self) -> Vec<AuditResult>;

    /// Total ingestion failures recorded
    fn ingestion_failure_count(&self) -> usize;
}

/// Concurrent in-memory result store
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    by_session: DashMap<Uuid, Vec<AuditResult>>,
    by_claim: DashMap<String, Vec<AuditResult>>,
    ingestion_failures: AtomicUsize,
}

impl InMemoryResultStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one committed result
    pub fn session_count(&self) -> usize {
        self.by_session.len()
    }
}

/// Append to a claim's history; results from one session follow batch
/// position, not the order parallel workers commit them in
fn insert_claim_history(history: &mut Vec<AuditResult>, result: AuditResult) {
    let at = history
        .iter()
        .rposition(|r| r.session_id != result.session_id || r.position < result.position)
        .map_or(0, |i| i + 1);
    history.insert(at, result);
}

impl ResultStore for InMemoryResultStore {
    fn commit(&self, result: AuditResult) -> Result<()> {
        // the session entry lock serializes commits within one session
        match self.by_session.entry(result.session_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().iter().any(|r| r.position == result.position) {
                    return Err(AuditError::validation_field(
                        format!(
                            "result for claim {} at position {} already committed in session {}",
                            result.claim_id, result.position, result.session_id
                        ),
                        "position",
                    ));
                }
                insert_claim_history(
                    &mut self.by_claim.entry(result.claim_id.clone()).or_default(),
                    result.clone(),
                );
                entry.get_mut().push(result);
            }
            Entry::Vacant(entry) => {
                insert_claim_history(
                    &mut self.by_claim.entry(result.claim_id.clone()).or_default(),
                    result.clone(),
                );
                entry.insert(vec![result]);
            }
        }
        Ok(())
    }

    fn record_ingestion_failure(&self, _session_id: Uuid, _claim_id: Option<&str>) {
        self.ingestion_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn session_results(&self, session_id: Uuid) -> Vec<AuditResult> {
        let mut results = self
            .by_session
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        results.sort_by_key(|r| r.position);
        results
    }

    fn latest(&self, claim_id: &str) -> Option<AuditResult> {
        self.by_claim
            .get(claim_id)
            .and_then(|entry| entry.value().last().cloned())
    }

    fn history(&self, claim_id: &str) -> Vec<AuditResult> {
        self.by_claim
            .get(claim_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn latest_results(&self) -> Vec<AuditResult> {
        self.by_claim
            .iter()
            .filter_map(|entry| entry.value().last().cloned())
            .collect()
    }

    fn ingestion_failure_count(&self) -> usize {
        self.ingestion_failures.load(Ordering::Relaxed)
    }
}

//! Main audit engine implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::results::{AuditResult, AuditStatistics, BatchManifest, Page, Paged};
use crate::api::session::{AuditSession, SessionStatus};
use crate::core::anomaly::{AnomalyModel, AnomalyScorer};
use crate::core::baseline::{BaselineProvider, SnapshotVersion};
use crate::core::claim::RawClaim;
use crate::core::config::AuditConfig;
use crate::core::errors::{AuditError, Result};
use crate::core::normalizer::raw_claim_id;
use crate::core::pipeline::{AuditCoordinator, SessionAbort, SessionInputs, SessionRun};
use crate::detectors::{ComplianceSource, RuleRegistry};
use crate::io::persistence::ResultStore;

#[derive(Debug)]
struct SessionEntry {
    session: AuditSession,
    cancel: Arc<AtomicBool>,
}

/// Main claim audit engine
///
/// Cheap to clone; clones share sessions, collaborators and the result store.
#[derive(Clone)]
pub struct AuditEngine {
    config: Arc<AuditConfig>,
    coordinator: Arc<AuditCoordinator>,
    baseline: Arc<dyn BaselineProvider>,
    model: Option<Arc<dyn AnomalyModel>>,
    compliance: Arc<dyn ComplianceSource>,
    store: Arc<dyn ResultStore>,
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
}

impl std::fmt::Debug for AuditEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditEngine")
            .field("coordinator", &self.coordinator)
            .field("model", &self.model.as_ref().map(|m| m.version().to_string()))
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl AuditEngine {
    /// Create an engine; invalid configuration is rejected here
    pub fn new(
        config: AuditConfig,
        baseline: Arc<dyn BaselineProvider>,
        model: Option<Arc<dyn AnomalyModel>>,
        compliance: Arc<dyn ComplianceSource>,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self> {
        info!("Initializing claim audit engine");
        let config = Arc::new(config);
        let coordinator = Arc::new(AuditCoordinator::new(Arc::clone(&config))?);

        Ok(Self {
            config,
            coordinator,
            baseline,
            model,
            compliance,
            store,
            sessions: Arc::new(DashMap::new()),
        })
    }

    /// Replace the standard rule set
    pub fn with_registry(mut self, registry: RuleRegistry) -> Result<Self> {
        let coordinator = AuditCoordinator::new(Arc::clone(&self.config))?.with_registry(registry);
        self.coordinator = Arc::new(coordinator);
        Ok(self)
    }

    /// Engine configuration
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Audit a batch against the latest baseline snapshot
    pub async fn submit_batch(&self, records: Vec<RawClaim>) -> Result<BatchManifest> {
        self.submit(records, None).await
    }

    /// Audit a batch against an explicit baseline snapshot version
    pub async fn submit_batch_pinned(
        &self,
        records: Vec<RawClaim>,
        version: SnapshotVersion,
    ) -> Result<BatchManifest> {
        self.submit(records, Some(version)).await
    }

    async fn submit(
        &self,
        records: Vec<RawClaim>,
        version: Option<SnapshotVersion>,
    ) -> Result<BatchManifest> {
        // Session-level preconditions fail before any claim is touched
        self.config.validate()?;
        let snapshot = self.baseline.get_snapshot(version)?;

        let received_at = Utc::now();
        let mut session = AuditSession::new(snapshot.version, received_at);
        session.claim_ids = records.iter().filter_map(raw_claim_id).collect();
        let scorer = self.session_scorer(&mut session);
        session.transition(SessionStatus::Running)?;

        let session_id = session.id;
        let cancel = Arc::new(AtomicBool::new(false));
        info!(
            session_id = %session_id,
            claims = records.len(),
            baseline_version = %snapshot.version,
            model_version = session.model_version.as_deref().unwrap_or("none"),
            "Audit session started"
        );
        self.sessions.insert(
            session_id,
            SessionEntry {
                session,
                cancel: Arc::clone(&cancel),
            },
        );

        let inputs = SessionInputs {
            session_id,
            snapshot,
            baseline: Arc::clone(&self.baseline),
            scorer,
            compliance: Arc::clone(&self.compliance),
            store: Arc::clone(&self.store),
            cancel,
            received_at,
        };
        let coordinator = Arc::clone(&self.coordinator);
        let joined =
            tokio::task::spawn_blocking(move || coordinator.run(&records, &inputs)).await;

        match joined {
            Ok(run) => self.finish_session(session_id, run),
            Err(join_error) => {
                let err = AuditError::internal(format!("audit worker failed: {join_error}"));
                if let Some(mut entry) = self.sessions.get_mut(&session_id) {
                    if let Err(transition_error) = entry.session.abort(err.to_string()) {
                        warn!("Could not abort session {}: {}", session_id, transition_error);
                    }
                }
                Err(err)
            }
        }
    }

    fn session_scorer(&self, session: &mut AuditSession) -> AnomalyScorer {
        let Some(model) = &self.model else {
            warn!("No anomaly model loaded; scoring in rule-only mode");
            session.warn("anomaly model unavailable; scoring in rule-only mode");
            return AnomalyScorer::unavailable();
        };

        let scorer = AnomalyScorer::new(Arc::clone(model));
        match scorer.check_features(&self.coordinator.feature_names()) {
            Ok(()) => {
                session.model_version = Some(model.version().to_string());
                scorer
            }
            Err(err) => {
                warn!("{}; scoring in rule-only mode", err);
                session.warn(format!("{err}; scoring in rule-only mode"));
                AnomalyScorer::unavailable()
            }
        }
    }

    fn finish_session(&self, session_id: Uuid, run: SessionRun) -> Result<BatchManifest> {
        let SessionRun { outcomes, abort } = run;
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AuditError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        let session = &mut entry.session;

        match abort {
            None => session.transition(SessionStatus::Complete)?,
            Some(SessionAbort::Cancelled) => {
                warn!(session_id = %session_id, "Audit session cancelled");
                session.abort("cancelled")?;
            }
            Some(SessionAbort::Failed(err)) => {
                error!(session_id = %session_id, "Audit session aborted: {}", err);
                session.abort(err.to_string())?;
            }
        }

        let manifest = BatchManifest {
            session_id,
            status: session.status,
            baseline_version: session.baseline_version,
            model_version: session.model_version.clone(),
            outcomes,
            warnings: session.warnings.clone(),
            abort_reason: session.abort_reason.clone(),
        };

        info!(
            session_id = %session_id,
            status = %manifest.status,
            audited = manifest.audited_count(),
            ingestion_failures = manifest.ingestion_failure_count(),
            not_processed = manifest.not_processed_count(),
            "Audit session finished"
        );
        Ok(manifest)
    }

    /// Committed results of a session, in submission order
    pub fn get_results(&self, session_id: Uuid) -> Result<Vec<AuditResult>> {
        self.ensure_session(session_id)?;
        Ok(self.store.session_results(session_id))
    }

    /// Latest result for a business claim id
    pub fn get_result(&self, claim_id: &str) -> Option<AuditResult> {
        self.store.latest(claim_id)
    }

    /// Every result for a business claim id, oldest first
    pub fn get_claim_history(&self, claim_id: &str) -> Vec<AuditResult> {
        self.store.history(claim_id)
    }

    /// Current state of a session
    pub fn get_session(&self, session_id: Uuid) -> Result<AuditSession> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| AuditError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Request cancellation of a running session
    ///
    /// Claims already committed keep their results; claims not yet committed
    /// end as not processed and the session is marked aborted.
    pub fn cancel_session(&self, session_id: Uuid) -> Result<()> {
        let entry = self
            .sessions
            .get(&session_id)
            .ok_or_else(|| AuditError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        if entry.session.status.is_terminal() {
            return Err(AuditError::InvalidTransition {
                from: entry.session.status.to_string(),
                to: SessionStatus::Aborted.to_string(),
            });
        }
        entry.cancel.store(true, Ordering::SeqCst);
        info!(session_id = %session_id, "Cancellation requested");
        Ok(())
    }

    /// Latest results at or above `min_score`, highest first
    pub fn flagged(&self, min_score: f64, page: Page) -> Paged<AuditResult> {
        let mut results: Vec<AuditResult> = self
            .store
            .latest_results()
            .into_iter()
            .filter(|r| r.suspicion_score >= min_score)
            .collect();
        results.sort_by(|a, b| {
            b.suspicion_score
                .total_cmp(&a.suspicion_score)
                .then_with(|| a.claim_id.cmp(&b.claim_id))
        });
        Paged::from_items(results, page)
    }

    /// Summary over the latest result of every claim
    pub fn statistics(&self) -> AuditStatistics {
        let latest = self.store.latest_results();
        AuditStatistics::from_results(
            &latest,
            self.store.ingestion_failure_count(),
            &self.config.risk_bands,
        )
    }

    fn ensure_session(&self, session_id: Uuid) -> Result<()> {
        if self.sessions.contains_key(&session_id) {
            Ok(())
        } else {
            Err(AuditError::SessionNotFound {
                session_id: session_id.to_string(),
            })
        }
    }
}

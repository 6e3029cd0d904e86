//! Per-session claim processing.
//!
//! A session runs in two phases. Every record is normalized and the session
//! claim index is built first; that build is the only write to shared state.
//! Rules, feature building, anomaly scoring and fusion then run in parallel
//! over the claims, each claim committing one complete result or none.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::api::results::{AuditResult, ClaimOutcome};
use crate::core::anomaly::AnomalyScorer;
use crate::core::baseline::{BaselineProvider, BaselineSnapshot};
use crate::core::claim::{Claim, RawClaim};
use crate::core::config::AuditConfig;
use crate::core::errors::{AuditError, Result};
use crate::core::featureset::ClaimFeatureBuilder;
use crate::core::normalizer::{normalize_batch, raw_claim_id, NormalizationContext};
use crate::core::scoring::ScoreFusion;
use crate::detectors::{ComplianceSource, RuleContext, RuleRegistry, SessionClaimIndex};
use crate::io::persistence::ResultStore;

/// Everything a session run reads besides the records
#[derive(Clone)]
pub struct SessionInputs {
    /// Session being processed
    pub session_id: Uuid,
    /// Snapshot pinned at submission
    pub snapshot: Arc<BaselineSnapshot>,
    /// Provider consulted to confirm the pinned version is still served
    pub baseline: Arc<dyn BaselineProvider>,
    /// Anomaly scorer, possibly without a model
    pub scorer: AnomalyScorer,
    /// Financial-assistance screening lookup
    pub compliance: Arc<dyn ComplianceSource>,
    /// Where results are committed
    pub store: Arc<dyn ResultStore>,
    /// Cooperative cancellation flag
    pub cancel: Arc<AtomicBool>,
    /// Submission time, used for records without a creation time
    pub received_at: DateTime<Utc>,
}

/// Why a session stopped early
#[derive(Debug)]
pub enum SessionAbort {
    /// Cancelled on request
    Cancelled,
    /// A session-level failure
    Failed(AuditError),
}

/// Outcome of running one session
#[derive(Debug)]
pub struct SessionRun {
    /// One outcome per record in submission order
    pub outcomes: Vec<ClaimOutcome>,
    /// Set when the session must be marked aborted
    pub abort: Option<SessionAbort>,
}

/// Runs audit sessions with a fixed rule set and fusion configuration
pub struct AuditCoordinator {
    config: Arc<AuditConfig>,
    registry: RuleRegistry,
    features: ClaimFeatureBuilder,
    fusion: ScoreFusion,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for AuditCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditCoordinator")
            .field("registry", &self.registry)
            .field("workers", &self.pool.as_ref().map(rayon::ThreadPool::current_num_threads))
            .finish()
    }
}

impl AuditCoordinator {
    /// Coordinator with the standard rule set; fails on invalid configuration
    pub fn new(config: Arc<AuditConfig>) -> Result<Self> {
        config.validate()?;
        let registry = RuleRegistry::standard(&config);
        let fusion = ScoreFusion::new(config.fusion())?;

        let pool = match config.performance.max_workers {
            0 => None,
            workers => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("claimaudit-worker-{i}"))
                    .build()
                    .map_err(|e| {
                        AuditError::config_field(
                            format!("Failed to build worker pool: {e}"),
                            "performance.max_workers",
                        )
                    })?,
            ),
        };

        Ok(Self {
            config,
            registry,
            features: ClaimFeatureBuilder::new(),
            fusion,
            pool,
        })
    }

    /// Replace the rule set
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Rules in evaluation order
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Feature names produced for the anomaly model
    pub fn feature_names(&self) -> Vec<String> {
        self.features.feature_names()
    }

    /// Process a batch of raw records for one session
    pub fn run(&self, records: &[RawClaim], inputs: &SessionInputs) -> SessionRun {
        let normalization = NormalizationContext::new(inputs.received_at, 0);
        let mut outcomes = Vec::with_capacity(records.len());
        let mut claims = Vec::with_capacity(records.len());

        for (position, normalized) in normalize_batch(records, &normalization)
            .into_iter()
            .enumerate()
        {
            match normalized {
                Ok(claim) => claims.push(claim),
                Err(error) => {
                    let claim_id = raw_claim_id(&records[position]);
                    warn!(
                        session_id = %inputs.session_id,
                        position,
                        claim_id = claim_id.as_deref().unwrap_or("<unknown>"),
                        field = error.field(),
                        "Claim failed normalization: {}",
                        error
                    );
                    inputs
                        .store
                        .record_ingestion_failure(inputs.session_id, claim_id.as_deref());
                    outcomes.push(ClaimOutcome::IngestionFailure {
                        position,
                        claim_id,
                        error,
                    });
                }
            }
        }

        // Barrier: the index is complete before any rule reads it
        let index = SessionClaimIndex::build(&claims);
        debug!(
            session_id = %inputs.session_id,
            claims = index.len(),
            "Built session claim index"
        );

        let context = RuleContext {
            snapshot: &inputs.snapshot,
            index: &index,
            compliance: inputs.compliance.as_ref(),
            config: &self.config,
        };
        let failure: Mutex<Option<AuditError>> = Mutex::new(None);
        let halted = AtomicBool::new(false);

        let evaluate_all = || -> Vec<ClaimOutcome> {
            claims
                .par_iter()
                .map(|claim| self.process(claim, &context, inputs, &halted, &failure))
                .collect()
        };
        let audited = match &self.pool {
            Some(pool) => pool.install(evaluate_all),
            None => evaluate_all(),
        };

        outcomes.extend(audited);
        outcomes.sort_by_key(ClaimOutcome::position);

        let abort = match failure.into_inner() {
            Some(err) => Some(SessionAbort::Failed(err)),
            None if inputs.cancel.load(Ordering::SeqCst)
                && outcomes
                    .iter()
                    .any(|o| matches!(o, ClaimOutcome::NotProcessed { .. })) =>
            {
                Some(SessionAbort::Cancelled)
            }
            None => None,
        };

        SessionRun { outcomes, abort }
    }

    fn process(
        &self,
        claim: &Claim,
        context: &RuleContext<'_>,
        inputs: &SessionInputs,
        halted: &AtomicBool,
        failure: &Mutex<Option<AuditError>>,
    ) -> ClaimOutcome {
        let not_processed = || ClaimOutcome::NotProcessed {
            position: claim.sequence,
            claim_id: Some(claim.claim_id.clone()),
        };
        let stop_requested =
            || inputs.cancel.load(Ordering::SeqCst) || halted.load(Ordering::SeqCst);

        if stop_requested() {
            return not_processed();
        }

        let findings = self.registry.evaluate(claim, context);
        let features = self.features.build(claim, &findings, context);
        let anomaly_score = match self.features.validate(&features) {
            Ok(()) if inputs.scorer.is_available() => inputs.scorer.score(&features).ok(),
            Ok(()) => None,
            Err(err) => {
                warn!(claim_id = %claim.claim_id, "Skipping anomaly score: {}", err);
                None
            }
        };
        let fused = self.fusion.fuse(&findings, anomaly_score);

        // The pinned version must still be served when the result is committed
        let pinned = inputs.snapshot.version;
        if !inputs.baseline.is_available(pinned) {
            let mut slot = failure.lock();
            if slot.is_none() {
                error!(
                    session_id = %inputs.session_id,
                    version = %pinned,
                    "Pinned baseline snapshot is no longer available"
                );
                *slot = Some(AuditError::snapshot_mismatch(
                    pinned.0,
                    "snapshot was retired while the session was running",
                ));
            }
            halted.store(true, Ordering::SeqCst);
            return not_processed();
        }
        if inputs.cancel.load(Ordering::SeqCst) {
            return not_processed();
        }

        let result = AuditResult {
            claim_id: claim.claim_id.clone(),
            record_id: claim.id,
            session_id: inputs.session_id,
            position: claim.sequence,
            findings,
            suspicion_score: fused.suspicion_score,
            recommended_action: fused.recommended_action,
            anomaly_score,
            baseline_version: pinned,
            model_version: anomaly_score
                .and(inputs.scorer.model_version())
                .map(str::to_string),
            audit_timestamp: Utc::now(),
        };

        match inputs.store.commit(result.clone()) {
            Ok(()) => {
                debug!(
                    claim_id = %result.claim_id,
                    score = result.suspicion_score,
                    action = result.recommended_action.label(),
                    "Committed audit result"
                );
                ClaimOutcome::Audited { result }
            }
            Err(err) => {
                error!(claim_id = %claim.claim_id, "Failed to commit audit result: {}", err);
                let mut slot = failure.lock();
                if slot.is_none() {
                    *slot = Some(err);
                }
                halted.store(true, Ordering::SeqCst);
                not_processed()
            }
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

//! Score fusion and recommended actions.
//!
//! Fusion is a pure function of a claim's findings and its anomaly score. The
//! deterministic base is the weight of the most severe finding; the anomaly
//! score can only add to it, scaled by the configured anomaly weight.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::FusionConfig;
use crate::core::errors::Result;
use crate::core::findings::{max_severity, Finding};

/// Action suggested to the audit team for a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecommendedAction {
    /// Strong case for disputing the claim with the provider
    #[serde(rename = "Refer for provider dispute")]
    ReferForProviderDispute,
    /// Supporting documentation is needed
    #[serde(rename = "Request medical records")]
    RequestMedicalRecords,
    /// An auditor should look at the claim
    #[serde(rename = "Flag for manual review")]
    FlagForManualReview,
    /// Nothing to do
    #[serde(rename = "No action")]
    NoAction,
}

impl RecommendedAction {
    /// All actions, most severe first
    pub const ALL: [RecommendedAction; 4] = [
        Self::ReferForProviderDispute,
        Self::RequestMedicalRecords,
        Self::FlagForManualReview,
        Self::NoAction,
    ];

    /// Label shown to auditors
    pub fn label(self) -> &'static str {
        match self {
            Self::ReferForProviderDispute => "Refer for provider dispute",
            Self::RequestMedicalRecords => "Request medical records",
            Self::FlagForManualReview => "Flag for manual review",
            Self::NoAction => "No action",
        }
    }

    /// True for every action other than [`RecommendedAction::NoAction`]
    pub fn requires_follow_up(self) -> bool {
        self != Self::NoAction
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of fusing findings with an anomaly score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionOutcome {
    /// Final suspicion score in [0, 1]
    pub suspicion_score: f64,
    /// Deterministic base from the most severe finding
    pub base: f64,
    /// Action selected by threshold
    pub recommended_action: RecommendedAction,
}

/// Combines rule findings and anomaly scores
#[derive(Debug, Clone)]
pub struct ScoreFusion {
    config: FusionConfig,
}

impl ScoreFusion {
    /// Create a fusion engine with validated settings
    pub fn new(config: FusionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Settings in use
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Base score: weight of the most severe finding, 0 without findings
    pub fn base_score(&self, findings: &[Finding]) -> f64 {
        max_severity(findings).map_or(0.0, |severity| {
            self.config.severity_weights.weight(severity)
        })
    }

    /// Fuse findings with an anomaly score (treated as 0 when absent)
    pub fn fuse(&self, findings: &[Finding], anomaly_score: Option<f64>) -> FusionOutcome {
        let base = self.base_score(findings);
        let anomaly = anomaly_score
            .filter(|score| score.is_finite())
            .map_or(0.0, |score| score.clamp(0.0, 1.0));

        let suspicion_score = (base + self.config.anomaly_weight * anomaly).clamp(0.0, 1.0);
        let recommended_action = self.config.action_thresholds.action_for(suspicion_score);

        debug!(
            base,
            anomaly,
            suspicion_score,
            action = recommended_action.label(),
            "Fused claim score"
        );

        FusionOutcome {
            suspicion_score,
            base,
            recommended_action,
        }
    }
}

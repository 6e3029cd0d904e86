//! Financial-assistance screening compliance for self-pay claims.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::context::RuleContext;
use super::AuditRule;
use crate::core::claim::Claim;
use crate::core::errors::{AuditError, Result};
use crate::core::findings::{Finding, Severity};

/// Rule identifier
pub const RULE_ID: &str = "missing_fa_screening";

/// External source of financial-assistance screening records
pub trait ComplianceSource: Send + Sync {
    /// Whether a screening record exists for the claim
    fn screening_present(&self, claim: &Claim) -> bool;
}

/// Source that knows of no screenings at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScreenings;

impl ComplianceSource for NoScreenings {
    fn screening_present(&self, _claim: &Claim) -> bool {
        false
    }
}

/// Screening records keyed by business claim id or by member id
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScreeningRegistry {
    /// Claims with a screening on file
    #[serde(default)]
    pub claim_ids: HashSet<String>,
    /// Members screened for every claim
    #[serde(default)]
    pub member_ids: HashSet<String>,
}

impl ScreeningRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a screening for one claim
    pub fn record_claim(&mut self, claim_id: impl Into<String>) -> &mut Self {
        self.claim_ids.insert(claim_id.into());
        self
    }

    /// Record a screening covering all of a member's claims
    pub fn record_member(&mut self, member_id: impl Into<String>) -> &mut Self {
        self.member_ids.insert(member_id.into());
        self
    }

    /// Load a registry from JSON
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuditError::io(
                format!("Failed to read screening records: {}", path.display()),
                e,
            )
        })?;
        serde_json::from_str(&content).map_err(Into::into)
    }
}

impl ComplianceSource for ScreeningRegistry {
    fn screening_present(&self, claim: &Claim) -> bool {
        self.claim_ids.contains(&claim.claim_id) || self.member_ids.contains(&claim.member_id)
    }
}

/// Flags self-pay claims billed without a financial-assistance screening
#[derive(Debug, Default)]
pub struct MissingScreeningRule;

impl AuditRule for MissingScreeningRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &str {
        "Self-pay claim billed without a financial-assistance screening on file"
    }

    fn evaluate(&self, claim: &Claim, context: &RuleContext<'_>) -> Vec<Finding> {
        if !claim.self_pay || context.compliance.screening_present(claim) {
            return Vec::new();
        }

        vec![Finding::new(
            RULE_ID,
            self.severity(),
            format!(
                "Self-pay claim {} was billed without a financial-assistance screening record",
                claim.claim_id
            ),
        )
        .with_evidence("member_id", claim.member_id.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AuditConfig;
    use crate::detectors::context::SessionClaimIndex;
    use crate::test_support::{empty_snapshot, ClaimFixture};

    fn run(claim: &Claim, compliance: &dyn ComplianceSource) -> Vec<Finding> {
        let snapshot = empty_snapshot();
        let index = SessionClaimIndex::build(std::slice::from_ref(claim));
        let config = AuditConfig::default();
        let context = RuleContext {
            snapshot: &snapshot,
            index: &index,
            compliance,
            config: &config,
        };
        MissingScreeningRule.evaluate(claim, &context)
    }

    #[test]
    fn insured_claims_are_ignored() {
        let claim = ClaimFixture::new("A").build();
        assert!(run(&claim, &NoScreenings).is_empty());
    }

    #[test]
    fn unscreened_self_pay_claim_is_flagged() {
        let claim = ClaimFixture::new("A").self_pay().build();
        let findings = run(&claim, &NoScreenings);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, RULE_ID);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn screening_by_claim_or_member_satisfies_rule() {
        let claim = ClaimFixture::new("A").self_pay().build();

        let mut by_claim = ScreeningRegistry::new();
        by_claim.record_claim("A");
        assert!(run(&claim, &by_claim).is_empty());

        let mut by_member = ScreeningRegistry::new();
        by_member.record_member("M-1");
        assert!(run(&claim, &by_member).is_empty());
    }
}

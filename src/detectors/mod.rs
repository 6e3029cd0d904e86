//! Deterministic audit rules and their registry.
//!
//! Each rule is an independent [`AuditRule`]: a pure function of a claim and a
//! read-only [`RuleContext`]. Rules never mutate shared state, so the registry
//! can be evaluated for many claims in parallel once the session index exists.

pub mod context;
pub mod duplicate;
pub mod price_outlier;
pub mod screening;
pub mod unbundling;
pub mod upcoding;

use std::sync::Arc;

use tracing::debug;

use crate::core::claim::Claim;
use crate::core::config::AuditConfig;
use crate::core::findings::{Finding, Severity};

pub use context::{RuleContext, SessionClaimIndex};
pub use duplicate::DuplicateDetector;
pub use price_outlier::PriceOutlierDetector;
pub use screening::{ComplianceSource, MissingScreeningRule, NoScreenings, ScreeningRegistry};
pub use unbundling::UnbundlingDetector;
pub use upcoding::UpcodingDetector;

/// A single deterministic audit rule
pub trait AuditRule: Send + Sync {
    /// Stable rule identifier reported on findings
    fn id(&self) -> &str;

    /// Severity the rule assigns. Rules with graded findings report the highest.
    fn severity(&self) -> Severity;

    /// Short human-readable description of what the rule checks
    fn description(&self) -> &str;

    /// Evaluate one claim
    fn evaluate(&self, claim: &Claim, context: &RuleContext<'_>) -> Vec<Finding>;
}

/// Ordered collection of audit rules
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn AuditRule>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rule_ids())
            .finish()
    }
}

impl RuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in rule, tuned by `config`
    pub fn standard(config: &AuditConfig) -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(DuplicateDetector::new(config.duplicate_lookback_days)))
            .register(Arc::new(PriceOutlierDetector::from_config(config)))
            .register(Arc::new(UpcodingDetector::new(config.code_tables.clone())))
            .register(Arc::new(UnbundlingDetector::new(config.code_tables.clone())))
            .register(Arc::new(MissingScreeningRule));
        registry
    }

    /// Append a rule; evaluation follows registration order
    pub fn register(&mut self, rule: Arc<dyn AuditRule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Registered rule ids in evaluation order
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule is registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against a claim, concatenating findings in rule order
    pub fn evaluate(&self, claim: &Claim, context: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            let produced = rule.evaluate(claim, context);
            if !produced.is_empty() {
                debug!(
                    claim_id = %claim.claim_id,
                    rule = rule.id(),
                    count = produced.len(),
                    "Rule produced findings"
                );
            }
            findings.extend(produced);
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{empty_snapshot, ClaimFixture};

    struct AlwaysInfo;

    impl AuditRule for AlwaysInfo {
        fn id(&self) -> &str {
            "always_info"
        }

        fn severity(&self) -> Severity {
            Severity::Info
        }

        fn description(&self) -> &str {
            "Emits one informational finding per claim"
        }

        fn evaluate(&self, claim: &Claim, _context: &RuleContext<'_>) -> Vec<Finding> {
            vec![Finding::new(self.id(), self.severity(), claim.claim_id.clone())]
        }
    }

    #[test]
    fn standard_registry_lists_builtin_rules_in_order() {
        let registry = RuleRegistry::standard(&AuditConfig::default());
        assert_eq!(
            registry.rule_ids(),
            vec![
                "duplicate_claim",
                "price_outlier",
                "upcoding",
                "unbundling",
                "missing_fa_screening"
            ]
        );
    }

    #[test]
    fn custom_rules_run_after_builtins() {
        let config = AuditConfig::default();
        let mut registry = RuleRegistry::standard(&config);
        registry.register(Arc::new(AlwaysInfo));

        let claim = ClaimFixture::new("A").build();
        let snapshot = empty_snapshot();
        let index = SessionClaimIndex::build(std::slice::from_ref(&claim));
        let context = RuleContext {
            snapshot: &snapshot,
            index: &index,
            compliance: &NoScreenings,
            config: &config,
        };

        let findings = registry.evaluate(&claim, &context);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "always_info");
        assert_eq!(registry.len(), 6);
    }
}

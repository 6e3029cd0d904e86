//! Component codes billed separately instead of their composite code.
//!
//! An encounter is every claim of one member with one provider on one date of
//! service. When an encounter contains all components of a bundle but not the
//! composite code, each component claim receives a finding.

use std::collections::BTreeSet;

use super::context::RuleContext;
use super::AuditRule;
use crate::core::claim::Claim;
use crate::core::config::CodeTables;
use crate::core::findings::{Finding, Severity};

/// Rule identifier
pub const RULE_ID: &str = "unbundling";

/// Flags separately billed bundle components
#[derive(Debug, Clone)]
pub struct UnbundlingDetector {
    tables: CodeTables,
}

impl UnbundlingDetector {
    /// Detector over the given bundle table
    pub fn new(tables: CodeTables) -> Self {
        Self { tables }
    }
}

impl AuditRule for UnbundlingDetector {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &str {
        "All components of a bundled procedure billed without the composite code"
    }

    fn evaluate(&self, claim: &Claim, context: &RuleContext<'_>) -> Vec<Finding> {
        let mut bundles = self.tables.bundles_containing(&claim.procedure_code).peekable();
        if bundles.peek().is_none() {
            return Vec::new();
        }

        let encounter: Vec<&Claim> = context.index.encounter(claim).collect();
        let billed: BTreeSet<&str> = encounter
            .iter()
            .map(|c| c.procedure_code.as_str())
            .collect();

        let mut findings = Vec::new();
        for (composite, bundle) in bundles {
            if billed.contains(composite) {
                continue;
            }
            if !bundle
                .components
                .iter()
                .all(|component| billed.contains(component.as_str()))
            {
                continue;
            }

            let component_claims: Vec<&str> = encounter
                .iter()
                .filter(|c| bundle.components.contains(&c.procedure_code))
                .map(|c| c.claim_id.as_str())
                .collect();

            findings.push(
                Finding::new(
                    RULE_ID,
                    self.severity(),
                    format!(
                        "Components of {} ({}) billed separately without composite code {}",
                        if bundle.name.is_empty() { composite } else { bundle.name.as_str() },
                        bundle.components.join(", "),
                        composite
                    ),
                )
                .with_evidence("composite_code", composite)
                .with_evidence("components", bundle.components.clone())
                .with_evidence("component_claim_ids", component_claims)
                .with_evidence("encounter", claim.encounter_key().to_string()),
            );
        }
        findings
    }
}

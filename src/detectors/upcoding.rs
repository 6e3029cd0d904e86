//! Service-level escalation within a code family.

use super::context::RuleContext;
use super::AuditRule;
use crate::core::claim::Claim;
use crate::core::config::CodeTables;
use crate::core::findings::{Finding, Severity};

/// Rule identifier
pub const RULE_ID: &str = "upcoding";

/// Levels a billed code may exceed the expected level without a finding
const TOLERATED_ESCALATION: i16 = 1;

/// Flags codes billed more than one service level above what is expected
#[derive(Debug, Clone)]
pub struct UpcodingDetector {
    tables: CodeTables,
}

impl UpcodingDetector {
    /// Detector over the given code families
    pub fn new(tables: CodeTables) -> Self {
        Self { tables }
    }
}

impl AuditRule for UpcodingDetector {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &str {
        "Billed service level exceeds the expected level for the code family"
    }

    fn evaluate(&self, claim: &Claim, _context: &RuleContext<'_>) -> Vec<Finding> {
        let Some(placement) = self.tables.level_of(&claim.procedure_code) else {
            return Vec::new();
        };

        let expected = claim
            .expected_service_level
            .unwrap_or(placement.expected_level);
        let escalation = i16::from(placement.level) - i16::from(expected);
        if escalation <= TOLERATED_ESCALATION {
            return Vec::new();
        }

        vec![Finding::new(
            RULE_ID,
            self.severity(),
            format!(
                "Procedure {} bills level {} of {} where level {} is expected",
                claim.procedure_code, placement.level, placement.family, expected
            ),
        )
        .with_evidence("family", placement.family)
        .with_evidence("billed_level", placement.level)
        .with_evidence("expected_level", expected)
        .with_evidence("escalation", escalation)]
    }
}

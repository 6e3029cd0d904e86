//! Robust price outlier detection against the pinned baseline.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::context::RuleContext;
use super::AuditRule;
use crate::core::baseline::BaselineStats;
use crate::core::claim::Claim;
use crate::core::config::AuditConfig;
use crate::core::findings::{Finding, Severity};

/// Rule identifier
pub const RULE_ID: &str = "price_outlier";

/// Robust deviation of a charge: `(charge - median) / dispersion`.
///
/// A zero dispersion makes any charge other than the median infinitely far
/// away; a charge equal to the median has deviation zero. `None` when the
/// difference from the median cannot be represented.
pub fn robust_deviation(charge: Decimal, stats: &BaselineStats) -> Option<f64> {
    let delta = charge.checked_sub(stats.median)?;
    if stats.dispersion.is_zero() {
        return Some(if delta.is_zero() {
            0.0
        } else if delta.is_sign_negative() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    match delta.checked_div(stats.dispersion) {
        Some(ratio) => ratio.to_f64(),
        None => Some(delta.to_f64()? / stats.dispersion.to_f64()?),
    }
}

/// Flags charges far from the baseline median for their procedure code
#[derive(Debug, Clone)]
pub struct PriceOutlierDetector {
    threshold: f64,
    critical_deviation: f64,
    min_sample_count: u64,
}

impl PriceOutlierDetector {
    /// Detector with explicit tuning
    pub fn new(threshold: f64, critical_deviation: f64, min_sample_count: u64) -> Self {
        Self {
            threshold,
            critical_deviation,
            min_sample_count,
        }
    }

    /// Detector tuned from the engine configuration
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(
            config.outlier_zscore_threshold,
            config.price_outlier.critical_deviation,
            config.min_baseline_sample_count,
        )
    }

    /// Severity for a deviation beyond the threshold
    fn severity_for(&self, deviation: f64) -> Severity {
        if deviation.abs() >= self.critical_deviation {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }
}

impl AuditRule for PriceOutlierDetector {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> &str {
        "Charge deviates from the historical median for the procedure code"
    }

    fn evaluate(&self, claim: &Claim, context: &RuleContext<'_>) -> Vec<Finding> {
        let Some(stats) = context.snapshot.get(&claim.procedure_code) else {
            return Vec::new();
        };
        // Thin baselines are not evidence either way
        if stats.sample_count < self.min_sample_count {
            return Vec::new();
        }
        let Some(deviation) = robust_deviation(claim.charge_amount, stats) else {
            return Vec::new();
        };
        if deviation.abs() <= self.threshold {
            return Vec::new();
        }

        let severity = self.severity_for(deviation);
        let direction = if deviation > 0.0 { "above" } else { "below" };
        let deviation_evidence = if deviation.is_finite() {
            serde_json::json!(deviation)
        } else {
            serde_json::json!(if deviation > 0.0 { "+inf" } else { "-inf" })
        };

        vec![Finding::new(
            RULE_ID,
            severity,
            format!(
                "Charge {} is {:.1} deviations {} the median {} for procedure {}",
                claim.charge_amount,
                deviation.abs(),
                direction,
                stats.median,
                claim.procedure_code
            ),
        )
        .with_evidence("deviation", deviation_evidence)
        .with_evidence("median", stats.median.to_string())
        .with_evidence("dispersion", stats.dispersion.to_string())
        .with_evidence("sample_count", stats.sample_count)
        .with_evidence("baseline_version", context.snapshot.version.0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::context::SessionClaimIndex;
    use crate::detectors::screening::NoScreenings;
    use crate::test_support::{snapshot_with, ClaimFixture};
    use approx::assert_relative_eq;

    fn run(claim: &Claim, median: i64, dispersion: i64, samples: u64) -> Vec<Finding> {
        let snapshot = snapshot_with("99213", median, dispersion, samples);
        let index = SessionClaimIndex::build(std::slice::from_ref(claim));
        let config = AuditConfig::default();
        let context = RuleContext {
            snapshot: &snapshot,
            index: &index,
            compliance: &NoScreenings,
            config: &config,
        };
        PriceOutlierDetector::from_config(&config).evaluate(claim, &context)
    }

    #[test]
    fn deviation_is_signed_and_scaled_by_dispersion() {
        let stats = BaselineStats::new(Decimal::new(300, 0), Decimal::new(50, 0), 100);
        assert_relative_eq!(robust_deviation(Decimal::new(950, 0), &stats).unwrap(), 13.0);
        assert_relative_eq!(robust_deviation(Decimal::new(200, 0), &stats).unwrap(), -2.0);
    }

    #[test]
    fn zero_dispersion_is_infinite_unless_at_median() {
        let stats = BaselineStats::new(Decimal::new(300, 0), Decimal::ZERO, 100);
        assert_eq!(robust_deviation(Decimal::new(300, 0), &stats), Some(0.0));
        assert_eq!(
            robust_deviation(Decimal::new(301, 0), &stats),
            Some(f64::INFINITY)
        );
    }

    #[test]
    fn large_deviation_is_critical() {
        let claim = ClaimFixture::new("A").charge(950).build();
        let findings = run(&claim, 300, 50, 100);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(
            findings[0].evidence("deviation"),
            Some(&serde_json::json!(13.0))
        );
    }

    #[test]
    fn moderate_deviation_is_a_warning() {
        // (520 - 300) / 50 = 4.4, above 3.0 but below 6.0
        let claim = ClaimFixture::new("A").charge(520).build();
        let findings = run(&claim, 300, 50, 100);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn charges_within_threshold_are_clean() {
        for charge in [150, 200, 300, 450] {
            let claim = ClaimFixture::new("A").charge(charge).build();
            assert!(run(&claim, 300, 50, 100).is_empty(), "charge {charge}");
        }
    }

    #[test]
    fn insufficient_samples_suppress_the_rule() {
        let claim = ClaimFixture::new("A").charge(950).build();
        assert!(run(&claim, 300, 50, 29).is_empty());
    }

    #[test]
    fn unknown_procedure_code_yields_nothing() {
        let claim = ClaimFixture::new("A").code("12345").charge(950).build();
        assert!(run(&claim, 300, 50, 100).is_empty());
    }

    #[test]
    fn zero_dispersion_mismatch_is_critical() {
        let claim = ClaimFixture::new("A").charge(301).build();
        let findings = run(&claim, 300, 0, 100);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(
            findings[0].evidence("deviation"),
            Some(&serde_json::json!("+inf"))
        );
    }
}

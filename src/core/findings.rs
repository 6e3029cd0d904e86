//! Rule findings and their severities.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a finding, ordered from least to most serious
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational observation
    Info,
    /// Likely billing problem that needs a human look
    Warning,
    /// Strong evidence of a billing violation
    Critical,
}

impl Severity {
    /// Lowercase label used in exported results
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One explainable reason a claim looks wrong
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Identifier of the rule that produced this finding
    pub rule_id: String,

    /// Human-readable explanation
    pub description: String,

    /// Severity defined by the producing rule
    pub severity: Severity,

    /// Structured evidence (comparator claim ids, ratios, baseline values)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub evidence: BTreeMap<String, serde_json::Value>,
}

impl Finding {
    /// Create a finding without evidence
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            severity,
            evidence: BTreeMap::new(),
        }
    }

    /// Attach a piece of evidence
    pub fn with_evidence(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }

    /// Look up a piece of evidence
    pub fn evidence(&self, key: &str) -> Option<&serde_json::Value> {
        self.evidence.get(key)
    }
}

/// Highest severity in a set of findings
pub fn max_severity(findings: &[Finding]) -> Option<Severity> {
    findings.iter().map(|f| f.severity).max()
}

/// Number of findings at each severity (info, warning, critical)
pub fn severity_counts(findings: &[Finding]) -> (usize, usize, usize) {
    findings
        .iter()
        .fold((0, 0, 0), |(info, warning, critical), f| match f.severity {
            Severity::Info => (info + 1, warning, critical),
            Severity::Warning => (info, warning + 1, critical),
            Severity::Critical => (info, warning, critical + 1),
        })
}

//! Procedure-code reference tables for the upcoding and unbundling rules.
//!
//! Code families order procedure codes by service level (index 0 is level 1).
//! Bundles map a composite code to the component codes it replaces.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::{AuditError, Result};

/// One family of codes describing escalating service levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeFamily {
    /// Codes ordered from the lowest to the highest service level
    pub codes: Vec<String>,

    /// Service level normally supported for this family (1-based)
    pub expected_level: u8,
}

impl CodeFamily {
    /// Create a family from ordered codes
    pub fn new<I, S>(codes: I, expected_level: u8) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            expected_level,
        }
    }

    /// 1-based service level of a code within this family
    pub fn level_of(&self, code: &str) -> Option<u8> {
        self.codes
            .iter()
            .position(|candidate| candidate == code)
            .and_then(|idx| u8::try_from(idx + 1).ok())
    }
}

/// Service-level placement of a billed code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLevel<'a> {
    /// Family name
    pub family: &'a str,
    /// Level of the billed code
    pub level: u8,
    /// Default expected level for the family
    pub expected_level: u8,
}

/// Composite code and the components it bundles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleDefinition {
    /// Human-readable bundle name
    #[serde(default)]
    pub name: String,

    /// Component codes that must not be billed separately
    pub components: Vec<String>,
}

/// Reference tables consumed by the code-based rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeTables {
    /// Code families keyed by family name
    #[serde(default = "CodeTables::default_families")]
    pub code_families: IndexMap<String, CodeFamily>,

    /// Bundles keyed by composite code
    #[serde(default = "CodeTables::default_bundles")]
    pub bundles: IndexMap<String, BundleDefinition>,
}

impl Default for CodeTables {
    fn default() -> Self {
        Self {
            code_families: Self::default_families(),
            bundles: Self::default_bundles(),
        }
    }
}

impl CodeTables {
    fn default_families() -> IndexMap<String, CodeFamily> {
        let mut families = IndexMap::new();
        families.insert(
            "established_office_visit".to_string(),
            CodeFamily::new(["99211", "99212", "99213", "99214", "99215"], 3),
        );
        families.insert(
            "new_office_visit".to_string(),
            CodeFamily::new(["99202", "99203", "99204", "99205"], 2),
        );
        families.insert(
            "emergency_department_visit".to_string(),
            CodeFamily::new(["99281", "99282", "99283", "99284", "99285"], 3),
        );
        families
    }

    fn default_bundles() -> IndexMap<String, BundleDefinition> {
        let mut bundles = IndexMap::new();
        bundles.insert(
            "80061".to_string(),
            BundleDefinition {
                name: "Lipid panel".to_string(),
                components: vec!["82465".into(), "83718".into(), "84478".into()],
            },
        );
        bundles.insert(
            "93000".to_string(),
            BundleDefinition {
                name: "Electrocardiogram, complete".to_string(),
                components: vec!["93005".into(), "93010".into()],
            },
        );
        bundles.insert(
            "80048".to_string(),
            BundleDefinition {
                name: "Basic metabolic panel".to_string(),
                components: vec![
                    "82310".into(),
                    "82374".into(),
                    "82435".into(),
                    "82565".into(),
                    "82947".into(),
                    "84132".into(),
                    "84295".into(),
                    "84520".into(),
                ],
            },
        );
        bundles
    }

    /// Locate a code in the family tables
    pub fn level_of(&self, code: &str) -> Option<CodeLevel<'_>> {
        self.code_families.iter().find_map(|(name, family)| {
            family.level_of(code).map(|level| CodeLevel {
                family: name.as_str(),
                level,
                expected_level: family.expected_level,
            })
        })
    }

    /// Bundles that list `code` as one of their components
    pub fn bundles_containing<'a>(
        &'a self,
        code: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a BundleDefinition)> + 'a {
        self.bundles
            .iter()
            .filter(move |(_, bundle)| bundle.components.iter().any(|c| c == code))
            .map(|(composite, bundle)| (composite.as_str(), bundle))
    }

    /// Validate table consistency
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (name, family) in &self.code_families {
            if family.codes.is_empty() {
                return Err(AuditError::config_field(
                    format!("code family '{}' has no codes", name),
                    format!("code_tables.code_families.{name}"),
                ));
            }
            if family.expected_level == 0 || usize::from(family.expected_level) > family.codes.len() {
                return Err(AuditError::config_field(
                    format!(
                        "code family '{}' expected_level {} must be between 1 and {}",
                        name,
                        family.expected_level,
                        family.codes.len()
                    ),
                    format!("code_tables.code_families.{name}.expected_level"),
                ));
            }
            for code in &family.codes {
                if !seen.insert(code.as_str()) {
                    return Err(AuditError::config_field(
                        format!("code '{}' appears in more than one family position", code),
                        format!("code_tables.code_families.{name}"),
                    ));
                }
            }
        }

        for (composite, bundle) in &self.bundles {
            let unique: HashSet<&str> = bundle.components.iter().map(String::as_str).collect();
            if unique.len() < 2 || unique.len() != bundle.components.len() {
                return Err(AuditError::config_field(
                    format!(
                        "bundle '{}' needs at least two distinct components",
                        composite
                    ),
                    format!("code_tables.bundles.{composite}"),
                ));
            }
            if unique.contains(composite.as_str()) {
                return Err(AuditError::config_field(
                    format!("bundle '{}' lists itself as a component", composite),
                    format!("code_tables.bundles.{composite}"),
                ));
            }
        }

        Ok(())
    }
}

//! Shared, read-only inputs for rule evaluation.
//!
//! The [`SessionClaimIndex`] is built once per session from every normalized
//! claim before any rule runs. After that it is only read, so rules can run in
//! parallel across claims without further synchronization.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::core::baseline::BaselineSnapshot;
use crate::core::claim::{Claim, DuplicateKey, EncounterKey};
use crate::core::config::AuditConfig;
use crate::detectors::screening::ComplianceSource;

/// Everything a rule may look at besides the claim itself
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    /// Baseline snapshot pinned by the session
    pub snapshot: &'a BaselineSnapshot,
    /// Index over all claims of the session
    pub index: &'a SessionClaimIndex,
    /// Financial-assistance screening lookup
    pub compliance: &'a dyn ComplianceSource,
    /// Validated engine configuration
    pub config: &'a AuditConfig,
}

impl std::fmt::Debug for RuleContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleContext")
            .field("snapshot_version", &self.snapshot.version)
            .field("indexed_claims", &self.index.len())
            .finish()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ProviderTotals {
    charge: Decimal,
    claims: usize,
}

/// Session-local lookup structure over normalized claims
#[derive(Debug, Default)]
pub struct SessionClaimIndex {
    claims: Vec<Claim>,
    by_duplicate_key: HashMap<DuplicateKey, Vec<usize>>,
    by_encounter: HashMap<EncounterKey, Vec<usize>>,
    provider_totals: HashMap<String, ProviderTotals>,
    member_provider: HashMap<(String, String), usize>,
}

impl SessionClaimIndex {
    /// Index a set of claims
    pub fn build(claims: &[Claim]) -> Self {
        let mut index = Self {
            claims: claims.to_vec(),
            ..Self::default()
        };

        for (slot, claim) in index.claims.iter().enumerate() {
            index
                .by_duplicate_key
                .entry(claim.duplicate_key())
                .or_default()
                .push(slot);
            index
                .by_encounter
                .entry(claim.encounter_key())
                .or_default()
                .push(slot);

            let totals = index
                .provider_totals
                .entry(claim.provider_id.clone())
                .or_default();
            // saturates; the total only feeds the provider mean charge feature
            totals.charge = totals
                .charge
                .checked_add(claim.charge_amount)
                .unwrap_or(Decimal::MAX);
            totals.claims += 1;

            *index
                .member_provider
                .entry((claim.member_id.clone(), claim.provider_id.clone()))
                .or_default() += 1;
        }

        let claims = &index.claims;
        for slots in index.by_duplicate_key.values_mut() {
            slots.sort_by_key(|slot| claims[*slot].creation_order());
        }

        index
    }

    /// Number of indexed claims
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// True when nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Claims sharing the duplicate key that were created before `claim`, oldest first
    pub fn created_before<'a>(&'a self, claim: &Claim) -> impl Iterator<Item = &'a Claim> + 'a {
        let order = claim.creation_order();
        self.by_duplicate_key
            .get(&claim.duplicate_key())
            .into_iter()
            .flatten()
            .map(move |slot| &self.claims[*slot])
            .take_while(move |other| other.creation_order() < order)
    }

    /// Every claim of the same member/provider/date encounter, including `claim`
    pub fn encounter(&self, claim: &Claim) -> impl Iterator<Item = &Claim> + '_ {
        self.by_encounter
            .get(&claim.encounter_key())
            .into_iter()
            .flatten()
            .map(move |slot| &self.claims[*slot])
    }

    /// Mean charge per claim for a provider within the session
    pub fn provider_mean_charge(&self, provider_id: &str) -> Option<f64> {
        self.provider_totals
            .get(provider_id)
            .filter(|totals| totals.claims > 0)
            .and_then(|totals| totals.charge.checked_div(Decimal::from(totals.claims)))
            .and_then(|mean| mean.to_f64())
    }

    /// Number of session claims for a member with a provider
    pub fn member_provider_frequency(&self, member_id: &str, provider_id: &str) -> usize {
        self.member_provider
            .get(&(member_id.to_string(), provider_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

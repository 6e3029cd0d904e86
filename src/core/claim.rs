//! Canonical claim representation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Loosely structured claim record as received from a claim source
pub type RawClaim = serde_json::Map<String, serde_json::Value>;

/// Default place-of-service code (office)
pub const DEFAULT_PLACE_OF_SERVICE: &str = "11";

/// A validated, immutable medical claim line.
///
/// Corrections never mutate a claim; they arrive as a new record with a new
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Stable record identifier
    pub id: Uuid,

    /// Business claim identifier
    pub claim_id: String,

    /// Member (patient) identifier
    pub member_id: String,

    /// Billing provider identifier
    pub provider_id: String,

    /// Date the service was rendered
    pub date_of_service: NaiveDate,

    /// Billed procedure code
    pub procedure_code: String,

    /// Billed amount, fixed-point with two decimal places
    pub charge_amount: Decimal,

    /// Billed units (at least 1)
    pub units: u32,

    /// Place-of-service code
    pub place_of_service: String,

    /// Patient is self-pay / uninsured
    pub self_pay: bool,

    /// Record creation time, the basis for original-versus-duplicate ordering
    pub created_at: DateTime<Utc>,

    /// Position of the record in its submitted batch
    pub sequence: usize,

    /// Service level documented for this encounter, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_service_level: Option<u8>,
}

impl Claim {
    /// Key shared by exact duplicates
    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey {
            member_id: self.member_id.clone(),
            provider_id: self.provider_id.clone(),
            procedure_code: self.procedure_code.clone(),
            date_of_service: self.date_of_service,
        }
    }

    /// Key shared by every line of one encounter
    pub fn encounter_key(&self) -> EncounterKey {
        EncounterKey {
            member_id: self.member_id.clone(),
            provider_id: self.provider_id.clone(),
            date_of_service: self.date_of_service,
        }
    }

    /// Total creation ordering: timestamp first, then batch position
    pub fn creation_order(&self) -> (DateTime<Utc>, usize) {
        (self.created_at, self.sequence)
    }
}

/// (member, provider, procedure code, date of service)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuplicateKey {
    /// Member identifier
    pub member_id: String,
    /// Provider identifier
    pub provider_id: String,
    /// Procedure code
    pub procedure_code: String,
    /// Date of service
    pub date_of_service: NaiveDate,
}

/// (member, provider, date of service)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncounterKey {
    /// Member identifier
    pub member_id: String,
    /// Provider identifier
    pub provider_id: String,
    /// Date of service
    pub date_of_service: NaiveDate,
}

impl fmt::Display for EncounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.member_id, self.provider_id, self.date_of_service
        )
    }
}

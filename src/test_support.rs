//! Claim and snapshot fixtures shared by unit tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::baseline::{BaselineSnapshot, BaselineStats, SnapshotVersion};
use crate::core::claim::Claim;

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

/// Builder for claims with sensible defaults
pub(crate) struct ClaimFixture {
    claim: Claim,
}

impl ClaimFixture {
    pub(crate) fn new(claim_id: &str) -> Self {
        Self {
            claim: Claim {
                id: Uuid::new_v5(&Uuid::NAMESPACE_OID, claim_id.as_bytes()),
                claim_id: claim_id.to_string(),
                member_id: "M-1".to_string(),
                provider_id: "P-1".to_string(),
                date_of_service: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                procedure_code: "99213".to_string(),
                charge_amount: Decimal::new(100, 0),
                units: 1,
                place_of_service: "11".to_string(),
                self_pay: false,
                created_at: epoch(),
                sequence: 0,
                expected_service_level: None,
            },
        }
    }

    pub(crate) fn member(mut self, member_id: &str) -> Self {
        self.claim.member_id = member_id.to_string();
        self
    }

    pub(crate) fn provider(mut self, provider_id: &str) -> Self {
        self.claim.provider_id = provider_id.to_string();
        self
    }

    pub(crate) fn code(mut self, code: &str) -> Self {
        self.claim.procedure_code = code.to_string();
        self
    }

    pub(crate) fn charge(mut self, amount: i64) -> Self {
        self.claim.charge_amount = Decimal::new(amount, 0);
        self
    }

    pub(crate) fn date(mut self, year: i32, month: u32, day: u32) -> Self {
        self.claim.date_of_service = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        self
    }

    pub(crate) fn created_minutes(mut self, minutes: i64) -> Self {
        self.claim.created_at = epoch() + Duration::minutes(minutes);
        self
    }

    pub(crate) fn created_days(mut self, days: i64) -> Self {
        self.claim.created_at = epoch() + Duration::days(days);
        self
    }

    pub(crate) fn sequence(mut self, sequence: usize) -> Self {
        self.claim.sequence = sequence;
        self
    }

    pub(crate) fn self_pay(mut self) -> Self {
        self.claim.self_pay = true;
        self
    }

    pub(crate) fn expected_level(mut self, level: u8) -> Self {
        self.claim.expected_service_level = Some(level);
        self
    }

    pub(crate) fn build(self) -> Claim {
        self.claim
    }
}

/// Snapshot with a single procedure code
pub(crate) fn snapshot_with(code: &str, median: i64, dispersion: i64, samples: u64) -> BaselineSnapshot {
    let mut stats = BTreeMap::new();
    stats.insert(
        code.to_string(),
        BaselineStats::new(Decimal::new(median, 0), Decimal::new(dispersion, 0), samples),
    );
    BaselineSnapshot {
        version: SnapshotVersion(1),
        as_of: epoch(),
        stats,
    }
}

/// Snapshot without any statistics
pub(crate) fn empty_snapshot() -> BaselineSnapshot {
    BaselineSnapshot {
        version: SnapshotVersion(1),
        as_of: epoch(),
        stats: BTreeMap::new(),
    }
}

//! Versioned historical pricing baselines.
//!
//! A [`BaselineSnapshot`] is immutable once published and is shared by `Arc`.
//! Sessions pin one version for their whole lifetime; publishing a new version
//! never touches a version already handed out.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::claim::Claim;
use crate::core::errors::{AuditError, Result};

/// Monotonically increasing snapshot version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotVersion(pub u64);

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Robust pricing statistics for one procedure code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineStats {
    /// Median historical charge
    pub median: Decimal,
    /// Median absolute deviation of historical charges
    pub dispersion: Decimal,
    /// Number of historical charges behind the statistics
    pub sample_count: u64,
}

impl BaselineStats {
    /// Create statistics from known values
    pub fn new(median: Decimal, dispersion: Decimal, sample_count: u64) -> Self {
        Self {
            median,
            dispersion,
            sample_count,
        }
    }

    /// Compute median and median absolute deviation from raw charges
    pub fn from_charges(charges: &[Decimal]) -> Self {
        if charges.is_empty() {
            return Self::new(Decimal::ZERO, Decimal::ZERO, 0);
        }

        let mut sorted = charges.to_vec();
        sorted.sort();
        let median = median_of_sorted(&sorted);

        let mut deviations: Vec<Decimal> = sorted.iter().map(|c| (*c - median).abs()).collect();
        deviations.sort();
        let dispersion = median_of_sorted(&deviations);

        Self::new(median, dispersion, charges.len() as u64)
    }
}

fn median_of_sorted(sorted: &[Decimal]) -> Decimal {
    let n = sorted.len();
    if n == 0 {
        return Decimal::ZERO;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        let (low, high) = (sorted[n / 2 - 1], sorted[n / 2]);
        low + (high - low) / Decimal::from(2u8)
    }
}

/// Immutable point-in-time pricing reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    /// Published version
    pub version: SnapshotVersion,
    /// Point in time the statistics describe
    pub as_of: DateTime<Utc>,
    /// Statistics keyed by procedure code
    pub stats: BTreeMap<String, BaselineStats>,
}

impl BaselineSnapshot {
    /// Statistics for a procedure code
    pub fn get(&self, procedure_code: &str) -> Option<&BaselineStats> {
        self.stats.get(procedure_code)
    }

    /// Number of procedure codes covered
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// True when no procedure codes are covered
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Load a snapshot artifact from JSON
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuditError::io(
                format!("Failed to read baseline snapshot: {}", path.display()),
                e,
            )
        })?;
        serde_json::from_str(&content).map_err(Into::into)
    }

    /// Write a snapshot artifact as JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            AuditError::io(
                format!("Failed to write baseline snapshot: {}", path.display()),
                e,
            )
        })
    }
}

/// Read-only source of baseline snapshots
pub trait BaselineProvider: Send + Sync {
    /// Fetch a specific version, or the latest when `version` is `None`
    fn get_snapshot(&self, version: Option<SnapshotVersion>) -> Result<Arc<BaselineSnapshot>>;

    /// Whether a version can still be served
    fn is_available(&self, version: SnapshotVersion) -> bool;
}

/// In-memory store of published snapshot versions
#[derive(Debug, Default)]
pub struct VersionedBaselineStore {
    snapshots: RwLock<BTreeMap<SnapshotVersion, Arc<BaselineSnapshot>>>,
    // highest version ever published, so retired numbers are never reused
    high_water: RwLock<u64>,
}

impl VersionedBaselineStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a single snapshot
    pub fn with_snapshot(snapshot: BaselineSnapshot) -> Self {
        let store = Self::new();
        *store.high_water.write() = snapshot.version.0;
        store
            .snapshots
            .write()
            .insert(snapshot.version, Arc::new(snapshot));
        store
    }

    /// Publish statistics as the next version
    pub fn publish(
        &self,
        stats: BTreeMap<String, BaselineStats>,
        as_of: DateTime<Utc>,
    ) -> Arc<BaselineSnapshot> {
        let mut snapshots = self.snapshots.write();
        let mut high_water = self.high_water.write();
        *high_water += 1;
        let next = SnapshotVersion(*high_water);
        let snapshot = Arc::new(BaselineSnapshot {
            version: next,
            as_of,
            stats,
        });
        snapshots.insert(next, Arc::clone(&snapshot));
        info!(version = %next, codes = snapshot.len(), "Published baseline snapshot");
        snapshot
    }

    /// Publish an externally built snapshot under its own version.
    ///
    /// The version must be newer than every version this store has ever
    /// published, retired ones included.
    pub fn publish_snapshot(&self, snapshot: BaselineSnapshot) -> Result<Arc<BaselineSnapshot>> {
        let mut snapshots = self.snapshots.write();
        let mut high_water = self.high_water.write();
        let version = snapshot.version;
        if version.0 <= *high_water {
            return Err(AuditError::validation_field(
                format!(
                    "baseline version {} is not newer than published version v{}",
                    version, *high_water
                ),
                "version",
            ));
        }
        *high_water = version.0;
        let snapshot = Arc::new(snapshot);
        snapshots.insert(version, Arc::clone(&snapshot));
        info!(version = %version, codes = snapshot.len(), "Published baseline snapshot");
        Ok(snapshot)
    }

    /// Recompute per-code statistics from historical claims and publish them
    pub fn publish_from_history(
        &self,
        claims: &[Claim],
        as_of: DateTime<Utc>,
    ) -> Arc<BaselineSnapshot> {
        self.publish(stats_from_history(claims), as_of)
    }

    /// Withdraw a version; sessions pinned to it can no longer continue
    pub fn retire(&self, version: SnapshotVersion) -> bool {
        let removed = self.snapshots.write().remove(&version).is_some();
        if removed {
            debug!(version = %version, "Retired baseline snapshot");
        }
        removed
    }

    /// Newest published version
    pub fn latest_version(&self) -> Option<SnapshotVersion> {
        self.snapshots.read().keys().next_back().copied()
    }
}

impl BaselineProvider for VersionedBaselineStore {
    fn get_snapshot(&self, version: Option<SnapshotVersion>) -> Result<Arc<BaselineSnapshot>> {
        let snapshots = self.snapshots.read();
        let found = match version {
            Some(v) => snapshots.get(&v),
            None => snapshots.values().next_back(),
        };
        found.cloned().ok_or_else(|| AuditError::SnapshotNotFound {
            version: version.map_or_else(|| "latest".to_string(), |v| v.to_string()),
        })
    }

    fn is_available(&self, version: SnapshotVersion) -> bool {
        self.snapshots.read().contains_key(&version)
    }
}

/// Group historical charges by procedure code and compute robust statistics
pub fn stats_from_history(claims: &[Claim]) -> BTreeMap<String, BaselineStats> {
    let mut charges: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for claim in claims {
        charges
            .entry(claim.procedure_code.clone())
            .or_default()
            .push(claim.charge_amount);
    }
    charges
        .into_iter()
        .map(|(code, values)| (code, BaselineStats::from_charges(&values)))
        .collect()
}

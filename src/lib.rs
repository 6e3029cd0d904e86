//! # claimaudit-rs: Post-Payment Medical Claim Audit Engine
//!
//! Audits paid medical claims for billing errors and missing compliance
//! screenings. Every claim gets:
//!
//! - **Rule Findings**: duplicates, price outliers, upcoding, unbundling and
//!   missing financial assistance screenings, each with structured evidence
//! - **Anomaly Score**: an optional isolation forest score over a fixed feature set
//! - **Suspicion Score**: severity weight fused with the anomaly score
//! - **Recommended Action**: a threshold on the suspicion score
//!
//! Results are reproducible: a session pins one baseline snapshot version and
//! every result records the versions it was computed against.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        API Layer                            │
//! │        AuditEngine • sessions • manifests • queries         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Core          │  Detectors       │  I/O                    │
//! │ • Normalizer   │ • Duplicate      │ • Claim sources         │
//! │ • Baseline     │ • Price outlier  │ • Result store          │
//! │ • Anomaly      │ • Upcoding       │ • Reports               │
//! │ • Fusion       │ • Unbundling     │                         │
//! │ • Pipeline     │ • Screening      │                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use claimaudit_rs::core::baseline::VersionedBaselineStore;
//! use claimaudit_rs::detectors::NoScreenings;
//! use claimaudit_rs::io::claim_source::load_records;
//! use claimaudit_rs::io::persistence::InMemoryResultStore;
//! use claimaudit_rs::{AuditConfig, AuditEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let baseline = Arc::new(VersionedBaselineStore::new());
//!     baseline.publish(Default::default(), chrono::Utc::now());
//!
//!     let engine = AuditEngine::new(
//!         AuditConfig::default(),
//!         baseline,
//!         None,
//!         Arc::new(NoScreenings),
//!         Arc::new(InMemoryResultStore::new()),
//!     )?;
//!     let manifest = engine.submit_batch(load_records("claims.json")?).await?;
//!
//!     println!("Audited {} claims", manifest.audited_count());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core audit engine modules
pub mod core {
    //! Claim model, baselines, scoring and the session pipeline.

    pub mod anomaly;
    pub mod baseline;
    pub mod claim;
    pub mod config;
    pub mod errors;
    pub mod featureset;
    pub mod findings;
    pub mod normalizer;
    pub mod pipeline;
    pub mod scoring;
}

// Deterministic audit rules
pub mod detectors;

// I/O, persistence, and reporting
pub mod io {
    //! Claim sources, result persistence and report export.

    pub mod claim_source;
    pub mod persistence;
    pub mod reports;
}

// Public API and engine interface
pub mod api {
    //! High-level API and engine interface.

    pub mod engine;
    pub mod results;
    pub mod session;
}

// Re-export primary types for convenience
pub use api::engine::AuditEngine;
pub use api::results::{AuditResult, BatchManifest, ClaimOutcome};
pub use core::config::AuditConfig;
pub use core::errors::{AuditError, NormalizationError, Result, ResultExt};
pub use core::scoring::RecommendedAction;

#[cfg(test)]
pub(crate) mod test_support;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

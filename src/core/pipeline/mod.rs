//! Audit session pipeline.
//!
//! Records flow through normalization, rule evaluation, feature building,
//! anomaly scoring and score fusion:
//!
//! 1. **Normalization**: raw records become canonical claims or ingestion failures
//! 2. **Indexing**: the session claim index is built once, before any rule runs
//! 3. **Evaluation**: rules and scoring run in parallel across claims
//! 4. **Commit**: each claim commits one complete result or none
//!
//! ## Usage
//!
//! ```ignore
//! use claimaudit_rs::core::pipeline::AuditCoordinator;
//!
//! let coordinator = AuditCoordinator::new(Arc::new(AuditConfig::default()))?;
//! let run = coordinator.run(&records, &inputs);
//! println!("{} outcomes", run.outcomes.len());
//! ```

pub use coordinator::{AuditCoordinator, SessionAbort, SessionInputs, SessionRun};

mod coordinator;

//! Batch audit command.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::args::AuditArgs;
use crate::cli::config_layer::build_layered_config;
use crate::cli::output::display_session_summary;
use claimaudit_rs::core::anomaly::{AnomalyModel, IsolationForestModel};
use claimaudit_rs::core::baseline::{BaselineSnapshot, VersionedBaselineStore};
use claimaudit_rs::core::normalizer::NormalizationContext;
use claimaudit_rs::detectors::{ComplianceSource, NoScreenings, ScreeningRegistry};
use claimaudit_rs::io::claim_source::{load_records, normalize_history};
use claimaudit_rs::io::persistence::InMemoryResultStore;
use claimaudit_rs::io::reports::{render_session, write_session, ReportFormat};
use claimaudit_rs::AuditEngine;

/// Audit a batch of claims and emit a session report
pub async fn audit_command(args: AuditArgs) -> anyhow::Result<()> {
    let config = build_layered_config(args.config.as_deref(), &args.thresholds)?;
    let records = load_records(&args.claims)
        .with_context(|| format!("Failed to load claims from {}", args.claims.display()))?;

    let baseline = load_baseline(&args)?;
    let model = load_model(args.model.as_deref());
    let compliance = load_screenings(args.screenings.as_deref())?;

    let engine = AuditEngine::new(
        config,
        baseline,
        model,
        compliance,
        Arc::new(InMemoryResultStore::new()),
    )?;
    let manifest = engine.submit_batch(records).await?;

    let format = ReportFormat::from(args.format);
    match &args.out {
        Some(path) => {
            write_session(&manifest, format, path)?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", render_session(&manifest, format)?),
    }
    display_session_summary(&manifest, &engine.statistics(), args.out.as_deref());

    if manifest.is_incomplete() {
        anyhow::bail!(
            "Audit session {} aborted: {}",
            manifest.session_id,
            manifest.abort_reason.as_deref().unwrap_or("unknown reason")
        );
    }

    let flagged = manifest
        .results()
        .filter(|r| r.recommended_action.requires_follow_up())
        .count();
    if args.fail_on_flagged && flagged > 0 {
        anyhow::bail!("{flagged} claim(s) need follow-up");
    }

    Ok(())
}

fn load_baseline(args: &AuditArgs) -> anyhow::Result<Arc<VersionedBaselineStore>> {
    if let Some(path) = &args.baseline {
        let snapshot = BaselineSnapshot::from_json_file(path)
            .with_context(|| format!("Failed to load baseline from {}", path.display()))?;
        return Ok(Arc::new(VersionedBaselineStore::with_snapshot(snapshot)));
    }

    let store = VersionedBaselineStore::new();
    let now = Utc::now();
    match &args.history {
        Some(path) => {
            let records = load_records(path)
                .with_context(|| format!("Failed to load history from {}", path.display()))?;
            let claims = normalize_history(&records, &NormalizationContext::new(now, 0));
            store.publish_from_history(&claims, now);
        }
        None => {
            warn!("No baseline supplied; price outliers cannot be detected");
            store.publish(BTreeMap::new(), now);
        }
    }
    if let Some(version) = store.latest_version() {
        info!(version = %version, "Baseline snapshot ready");
    }
    Ok(Arc::new(store))
}

fn load_model(path: Option<&Path>) -> Option<Arc<dyn AnomalyModel>> {
    let path = path?;
    match IsolationForestModel::from_json_file(path) {
        Ok(model) => Some(Arc::new(model)),
        Err(err) => {
            warn!(path = %path.display(), "Ignoring anomaly model: {}", err);
            None
        }
    }
}

fn load_screenings(path: Option<&Path>) -> anyhow::Result<Arc<dyn ComplianceSource>> {
    let source: Arc<dyn ComplianceSource> = match path {
        Some(path) => Arc::new(
            ScreeningRegistry::from_json_file(path)
                .with_context(|| format!("Failed to load screenings from {}", path.display()))?,
        ),
        None => Arc::new(NoScreenings),
    };
    Ok(source)
}

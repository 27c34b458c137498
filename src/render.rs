use remover_contracts::models::{
    ClassifiedCandidate, Identity, InstalledApp, OrphanEntry, PurgeReport, RemovalOutcome,
    RemovalResult, RestoreOutcome, RestoreResult, RiskReason, RiskTier, ScanWarning,
    StagedBatchSummary, StartupItem,
};
use remover_contracts::{AppError, AppResult, ResultExt};
use remover_engine::{EngineErrorCode, format_size};
use serde::Serialize;

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value)
        .with_code("output_encode_failed", "Failed to encode output")?;
    println!("{text}");
    Ok(())
}

pub(crate) fn print_error(error: &AppError, json: bool) {
    if json {
        if let Ok(text) = serde_json::to_string_pretty(error) {
            eprintln!("{text}");
            return;
        }
    }
    eprintln!("error[{}]: {}", error.code, error.message);
    for item in &error.context {
        eprintln!("  {}: {}", item.key, item.value);
    }
}

pub(crate) fn installed_apps(apps: &[InstalledApp]) -> String {
    if apps.is_empty() {
        return "No applications found.".to_string();
    }
    let mut out = String::new();
    for app in apps {
        out.push_str(&format!(
            "{:<32} {:>10}  {}\n",
            app.name,
            format_size(app.size_bytes),
            app.bundle_id.as_deref().unwrap_or("-")
        ));
    }
    out.push_str(&format!("{} applications", apps.len()));
    out
}

pub(crate) fn scan_summary(
    identity: &Identity,
    classified: &[ClassifiedCandidate],
    warnings: &[ScanWarning],
) -> String {
    let mut out = format!(
        "{} ({})\n",
        identity.display_name,
        identity.bundle_id.as_deref().unwrap_or("no bundle id")
    );
    if classified.is_empty() {
        out.push_str("No residual files found.\n");
    }
    for tier in [RiskTier::Safe, RiskTier::Caution, RiskTier::Excluded] {
        let items = classified
            .iter()
            .filter(|item| item.tier == tier)
            .collect::<Vec<_>>();
        if items.is_empty() {
            continue;
        }
        let total = items
            .iter()
            .map(|item| item.candidate.size_bytes)
            .fold(0u64, u64::saturating_add);
        out.push_str(&format!(
            "\n[{}] {} entries, {}\n",
            tier.as_str(),
            items.len(),
            format_size(total)
        ));
        for item in items {
            let candidate = &item.candidate;
            out.push_str(&format!(
                "  {:>10}  {}  ({} {:.1}){}\n",
                format_size(candidate.size_bytes),
                candidate.path.display(),
                candidate.match_method.as_str(),
                candidate.confidence,
                if candidate.requires_elevation { " [admin]" } else { "" }
            ));
            for reason in &item.reasons {
                out.push_str(&format!("              - {}\n", reason_text(reason)));
            }
        }
    }
    if !warnings.is_empty() {
        out.push_str(&format!("\n{} locations could not be fully read\n", warnings.len()));
    }
    out
}

fn reason_text(reason: &RiskReason) -> String {
    match reason {
        RiskReason::DenylistOverlap { fragment } => format!("protected location ({fragment})"),
        RiskReason::ProtectedPath { path } => format!("protected path {}", path.display()),
        RiskReason::ProtectedNamePrefix { prefix } => format!("protected name prefix {prefix}"),
        RiskReason::OtherApplicationBundle { bundle_root } => {
            format!("belongs to {}", bundle_root.display())
        }
        RiskReason::LinkEscapesBoundary => "symlink points outside known locations".to_string(),
        RiskReason::SystemScopeRequiresExactId => {
            "system location without an exact identifier match".to_string()
        }
        RiskReason::BundleFragmentMatch => "partial name match on an application".to_string(),
        RiskReason::LowConfidence => "low confidence".to_string(),
        RiskReason::ModerateConfidence => "partial name match".to_string(),
        RiskReason::OversizedMatch {
            size_bytes,
            threshold_bytes,
        } => format!(
            "large ({} over {})",
            format_size(*size_bytes),
            format_size(*threshold_bytes)
        ),
    }
}

pub(crate) fn removal_result(result: &RemovalResult) -> String {
    let mut out = String::new();
    for item in &result.items {
        let status = match &item.outcome {
            RemovalOutcome::Removed => "removed".to_string(),
            RemovalOutcome::Skipped { reason } => format!("skipped ({reason:?})"),
            RemovalOutcome::Failed { reason, detail } => {
                let code = EngineErrorCode::for_removal_outcome(&item.outcome)
                    .map(EngineErrorCode::as_str)
                    .unwrap_or("io");
                format!("failed ({reason:?}, {code}): {detail}")
            }
        };
        out.push_str(&format!("  {}  {}\n", item.path.display(), status));
    }
    out.push_str(&format!(
        "{} removed, {} skipped, {} failed, {} reclaimed ({})",
        result.removed_count(),
        result.skipped_count(),
        result.failed_count(),
        format_size(result.reclaimed_bytes),
        result.mode.as_str()
    ));
    if let Some(batch_id) = result.batch_id.as_deref() {
        out.push_str(&format!("\nrestore with: app-remover restore {batch_id}"));
    }
    if result.cancelled {
        out.push_str("\ncancelled before all items were processed");
    }
    out
}

pub(crate) fn restore_result(result: &RestoreResult) -> String {
    let mut out = String::new();
    for item in &result.items {
        let status = match &item.outcome {
            RestoreOutcome::Restored => "restored".to_string(),
            RestoreOutcome::AlreadyRestored => "already restored".to_string(),
            RestoreOutcome::Failed { reason, detail } => {
                let code = EngineErrorCode::for_restore_outcome(&item.outcome)
                    .map(EngineErrorCode::as_str)
                    .unwrap_or("io");
                format!("failed ({reason:?}, {code}): {detail}")
            }
        };
        out.push_str(&format!("  {}  {}\n", item.original_path.display(), status));
    }
    out.push_str(&format!(
        "{} of {} restored from {}",
        result.restored_count(),
        result.items.len(),
        result.batch_id
    ));
    out
}

pub(crate) fn batches(batches: &[StagedBatchSummary]) -> String {
    if batches.is_empty() {
        return "Nothing staged.".to_string();
    }
    batches
        .iter()
        .map(|batch| {
            format!(
                "{}  {:<24} {:>4} items {:>10}  expires {}",
                batch.batch_id,
                batch.app_name,
                batch.item_count,
                format_size(batch.total_bytes),
                batch.expires_at_ms / 1000
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn purge_report(report: &PurgeReport) -> String {
    format!(
        "{} batches purged, {} reclaimed",
        report.purged_batches.len(),
        format_size(report.reclaimed_bytes)
    )
}

pub(crate) fn orphans(entries: &[OrphanEntry]) -> String {
    if entries.is_empty() {
        return "No orphaned data found.".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{:>10}  {:<40} {}\n",
            format_size(entry.size_bytes),
            entry.probable_id,
            entry.path.display()
        ));
    }
    let total = entries
        .iter()
        .map(|entry| entry.size_bytes)
        .fold(0u64, u64::saturating_add);
    out.push_str(&format!("{} entries, {}", entries.len(), format_size(total)));
    out
}

pub(crate) fn startup_items(items: &[StartupItem]) -> String {
    if items.is_empty() {
        return "No startup items found.".to_string();
    }
    let mut out = String::new();
    for item in items {
        let state = if item.disabled { "disabled" } else { "enabled" };
        let elevation = if item.requires_elevation { " (admin)" } else { "" };
        out.push_str(&format!(
            "{:<13} {:<8} {:<36} {}{}\n",
            item.kind.as_str(),
            state,
            item.name,
            item.path.display(),
            elevation
        ));
        if let Some(program) = item.program.as_deref() {
            out.push_str(&format!("{:<23}runs {program}\n", ""));
        }
    }
    out.push_str(&format!("{} items", items.len()));
    out
}

pub(crate) fn startup_disabled(item: &StartupItem) -> String {
    format!("Disabled {} ({})", item.name, item.path.display())
}

use crate::bootstrap::AppContext;
use crate::cli::{Cli, Command, TargetArgs};
use crate::render;
use remover_contracts::models::{
    ClassifiedCandidate, Identity, RemovalMode, RemovalResult, RiskTier, ScanWarning,
};
use remover_contracts::{AppError, AppResult, ResultExt};
use remover_engine::{RemovalPlan, RiskPolicy, format_size};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when some items could not be removed or restored.
const PARTIAL_FAILURE_EXIT: u8 = 2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanOutput<'a> {
    identity: &'a Identity,
    candidates: &'a [ClassifiedCandidate],
    warnings: &'a [ScanWarning],
    roots_scanned: usize,
    cancelled: bool,
}

pub(crate) async fn dispatch(cli: Cli, context: &AppContext) -> AppResult<ExitCode> {
    let json = cli.json;
    let engine = &context.engine;

    match cli.command {
        Command::Apps => {
            let apps = engine.list_installed_apps().await?;
            emit(json, &apps, || render::installed_apps(&apps))?;
        }
        Command::Scan { target } => {
            let scanned = scan_target(context, &target).await?;
            let Some(scanned) = scanned else {
                return Ok(cancelled_exit(json));
            };
            emit(json, &scanned.output(), || {
                render::scan_summary(&scanned.identity, &scanned.classified, &scanned.warnings)
            })?;
        }
        Command::Remove {
            target,
            permanent,
            include_caution,
            reset,
            yes,
        } => {
            let Some(scanned) = scan_target(context, &target).await? else {
                return Ok(cancelled_exit(json));
            };
            let plan = if reset {
                RemovalPlan::leftovers(&scanned.classified, &scanned.policy)
            } else {
                RemovalPlan::from_tiers(&scanned.classified, include_caution, &scanned.policy)
            };
            if !json {
                println!(
                    "{}",
                    render::scan_summary(&scanned.identity, &scanned.classified, &scanned.warnings)
                );
            }
            if plan.is_empty() {
                emit(json, &scanned.output(), || "Nothing to remove.".to_string())?;
                return Ok(ExitCode::SUCCESS);
            }
            let mode = removal_mode(permanent);
            let question = format!(
                "{} {} entries ({})?",
                if permanent { "Permanently delete" } else { "Remove" },
                plan.len(),
                format_size(plan.total_bytes())
            );
            if !yes && !confirm(question.as_str())? {
                eprintln!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            let result = engine
                .execute(
                    plan,
                    mode,
                    scanned.identity.display_name.as_str(),
                    &context.cancel,
                )
                .await?;
            return report_removal(json, &result);
        }
        Command::Restore { batch_id } => {
            let result = engine.restore(batch_id.as_str()).await?;
            emit(json, &result, || render::restore_result(&result))?;
            if !result.is_complete() {
                return Ok(ExitCode::from(PARTIAL_FAILURE_EXIT));
            }
        }
        Command::Batches => {
            let batches = engine.list_staged_batches().await?;
            emit(json, &batches, || render::batches(&batches))?;
        }
        Command::Purge => {
            let report = engine.purge_expired().await?;
            emit(json, &report, || render::purge_report(&report))?;
        }
        Command::Orphans {
            remove,
            permanent,
            yes,
        } => {
            if remove.is_empty() {
                let orphans = engine.scan_orphans().await?;
                emit(json, &orphans, || render::orphans(&orphans))?;
                return Ok(ExitCode::SUCCESS);
            }
            let selected = absolute_paths(remove)?;
            let question = format!(
                "{} {} orphaned entries?",
                if permanent { "Permanently delete" } else { "Remove" },
                selected.len()
            );
            if !yes && !confirm(question.as_str())? {
                eprintln!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            let result = engine
                .remove_orphans(selected, removal_mode(permanent), &context.cancel)
                .await?;
            return report_removal(json, &result);
        }
        Command::Startup {
            remove,
            disable,
            permanent,
            yes,
        } => {
            if let Some(path) = disable {
                let path = absolute_path(path)?;
                let question = format!("Disable {}?", path.display());
                if !yes && !confirm(question.as_str())? {
                    eprintln!("Aborted.");
                    return Ok(ExitCode::SUCCESS);
                }
                let item = engine.disable_startup_item(&path).await?;
                emit(json, &item, || render::startup_disabled(&item))?;
                return Ok(ExitCode::SUCCESS);
            }
            if remove.is_empty() {
                let items = engine.list_startup_items().await?;
                emit(json, &items, || render::startup_items(&items))?;
                return Ok(ExitCode::SUCCESS);
            }
            let selected = absolute_paths(remove)?;
            let question = format!(
                "Unload and {} {} startup items?",
                if permanent { "permanently delete" } else { "remove" },
                selected.len()
            );
            if !yes && !confirm(question.as_str())? {
                eprintln!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            let result = engine
                .remove_startup_items(selected, removal_mode(permanent), &context.cancel)
                .await?;
            return report_removal(json, &result);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn removal_mode(permanent: bool) -> RemovalMode {
    if permanent {
        RemovalMode::Permanent
    } else {
        RemovalMode::Staged
    }
}

fn report_removal(json: bool, result: &RemovalResult) -> AppResult<ExitCode> {
    emit(json, result, || render::removal_result(result))?;
    if result.failed_count() > 0 {
        return Ok(ExitCode::from(PARTIAL_FAILURE_EXIT));
    }
    Ok(ExitCode::SUCCESS)
}

/// Listings report absolute paths; relative arguments are resolved against
/// the working directory to match them.
fn absolute_path(path: PathBuf) -> AppResult<PathBuf> {
    std::path::absolute(&path)
        .with_code("path_invalid", "Cannot resolve path")
        .with_ctx("path", path.display().to_string())
}

fn absolute_paths(paths: Vec<PathBuf>) -> AppResult<Vec<PathBuf>> {
    paths.into_iter().map(absolute_path).collect()
}

struct ScannedTarget {
    identity: Identity,
    policy: RiskPolicy,
    classified: Vec<ClassifiedCandidate>,
    warnings: Vec<ScanWarning>,
    roots_scanned: usize,
}

impl ScannedTarget {
    fn output(&self) -> ScanOutput<'_> {
        ScanOutput {
            identity: &self.identity,
            candidates: &self.classified,
            warnings: &self.warnings,
            roots_scanned: self.roots_scanned,
            cancelled: false,
        }
    }
}

/// Resolves, scans and classifies. `None` when the scan was cancelled.
async fn scan_target(context: &AppContext, target: &TargetArgs) -> AppResult<Option<ScannedTarget>> {
    let engine = &context.engine;
    let identity = engine.resolve_identity(&target.to_reference())?;
    let report = engine.scan(&identity, &context.cancel).await?;
    if report.cancelled {
        return Ok(None);
    }
    let policy = engine.load_risk_policy(&identity).await?;
    let mut classified = remover_engine::classify(report.candidates, &policy);
    classified.sort_by(|left, right| {
        tier_rank(left.tier)
            .cmp(&tier_rank(right.tier))
            .then(left.candidate.path.cmp(&right.candidate.path))
    });
    Ok(Some(ScannedTarget {
        identity,
        policy,
        classified,
        warnings: report.warnings,
        roots_scanned: report.roots_scanned,
    }))
}

fn tier_rank(tier: RiskTier) -> u8 {
    match tier {
        RiskTier::Safe => 0,
        RiskTier::Caution => 1,
        RiskTier::Excluded => 2,
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> AppResult<()> {
    if json {
        return render::print_json(value);
    }
    println!("{}", text());
    Ok(())
}

fn cancelled_exit(json: bool) -> ExitCode {
    if json {
        println!("{{\"cancelled\": true}}");
    } else {
        println!("Cancelled.");
    }
    ExitCode::from(130)
}

/// Asks on stderr so that `--json` output on stdout stays parseable.
fn confirm(question: &str) -> AppResult<bool> {
    let stdin = std::io::stdin();
    confirm_with(question, &mut stdin.lock(), &mut std::io::stderr())
}

pub(crate) fn confirm_with(
    question: &str,
    input: &mut impl BufRead,
    prompt: &mut impl Write,
) -> AppResult<bool> {
    write!(prompt, "{question} [y/N] ")
        .and_then(|()| prompt.flush())
        .with_code("prompt_failed", "Failed to write prompt")?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .with_code("prompt_failed", "Failed to read answer")?;
    Ok(is_yes(answer.as_str()))
}

pub(crate) fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn error_exit(error: &AppError, json: bool) -> ExitCode {
    render::print_error(error, json);
    ExitCode::FAILURE
}

#[cfg(test)]
#[path = "../tests/cli/commands_tests.rs"]
mod commands_tests;

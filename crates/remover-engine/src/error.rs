use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    UnresolvableIdentity,
    PermissionDenied,
    StaleCandidate,
    StagingFailure,
    RestoreFailure,
    RestoreBatchNotFound,
    PlanContainsExcluded,
    PlanUnknownCandidate,
    ManifestReadFailed,
    ManifestWriteFailed,
    CatalogHomeUnavailable,
    StartupItemNotFound,
    StartupFormatUnsupported,
    StartupUpdateFailed,
}

impl EngineErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnresolvableIdentity => "remover_unresolvable_identity",
            Self::PermissionDenied => "remover_permission_denied",
            Self::StaleCandidate => "remover_stale_candidate",
            Self::StagingFailure => "remover_staging_failure",
            Self::RestoreFailure => "remover_restore_failure",
            Self::RestoreBatchNotFound => "remover_restore_batch_not_found",
            Self::PlanContainsExcluded => "remover_plan_contains_excluded",
            Self::PlanUnknownCandidate => "remover_plan_unknown_candidate",
            Self::ManifestReadFailed => "remover_manifest_read_failed",
            Self::ManifestWriteFailed => "remover_manifest_write_failed",
            Self::CatalogHomeUnavailable => "remover_catalog_home_unavailable",
            Self::StartupItemNotFound => "remover_startup_item_not_found",
            Self::StartupFormatUnsupported => "remover_startup_format_unsupported",
            Self::StartupUpdateFailed => "remover_startup_update_failed",
        }
    }

    /// Code reported to the shell for a per-item removal outcome.
    pub fn for_removal_outcome(outcome: &RemovalOutcome) -> Option<Self> {
        match outcome {
            RemovalOutcome::Removed => None,
            RemovalOutcome::Skipped {
                reason: SkipReason::StaleCandidate,
            } => Some(Self::StaleCandidate),
            RemovalOutcome::Skipped { .. } => None,
            RemovalOutcome::Failed {
                reason: FailureReason::PermissionDenied,
                ..
            } => Some(Self::PermissionDenied),
            RemovalOutcome::Failed { .. } => None,
        }
    }

    /// Code reported to the shell for a per-item restore outcome.
    pub fn for_restore_outcome(outcome: &RestoreOutcome) -> Option<Self> {
        match outcome {
            RestoreOutcome::Failed { .. } => Some(Self::RestoreFailure),
            RestoreOutcome::Restored | RestoreOutcome::AlreadyRestored => None,
        }
    }
}

pub(crate) fn engine_error(code: EngineErrorCode, message: impl Into<String>) -> AppError {
    AppError::new(code.as_str(), message.into())
}

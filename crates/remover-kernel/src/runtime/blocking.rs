use crate::{AppError, AppResult};

/// Runs filesystem-bound work on tokio's blocking pool and folds join
/// failures into `AppError`.
pub async fn run_blocking<T, F>(label: &'static str, job: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(job);
    match handle.await {
        Ok(result) => result,
        Err(error) => Err(join_error_to_app_error(label, &error)),
    }
}

pub fn join_error_to_app_error(label: &str, error: &tokio::task::JoinError) -> AppError {
    if error.is_cancelled() {
        return AppError::new("blocking_task_canceled", "Blocking task was cancelled")
            .with_context("blockingTask", label);
    }

    if error.is_panic() {
        tracing::error!(event = "blocking_task_panicked", task = label);
        return AppError::new("blocking_task_panicked", "Blocking task panicked")
            .with_context("joinError", join_error_detail(error))
            .with_context("blockingTask", label);
    }

    AppError::new("blocking_task_failed", "Blocking task failed")
        .with_context("joinError", join_error_detail(error))
        .with_context("blockingTask", label)
}

fn join_error_detail(error: &tokio::task::JoinError) -> String {
    let debug_text = format!("{error:?}");
    if debug_text.trim().is_empty() {
        "join error".to_string()
    } else {
        debug_text
    }
}

#[cfg(test)]
#[path = "../../tests/runtime/blocking_tests.rs"]
mod blocking_tests;

use remover_contracts::AppResult;
use remover_engine::{PathCatalog, RemoverEngine};
use remover_kernel::CancelFlag;
use remover_logging::{LoggingGuard, init_logging, sanitize_path};
use remover_settings::{load_or_init, settings_dir, settings_file_path};
use std::fs;

pub(crate) struct AppContext {
    pub(crate) engine: RemoverEngine,
    pub(crate) cancel: CancelFlag,
    _logging: Option<LoggingGuard>,
}

pub(crate) fn log_warn_fallback(message: &str) {
    if tracing::dispatcher::has_been_set() {
        tracing::warn!(event = "bootstrap_warning", message = message);
        return;
    }

    eprintln!("{message}");
}

/// Loads settings, installs logging and builds the engine. Logging failures
/// are reported but never stop the tool.
pub(crate) fn bootstrap() -> AppResult<AppContext> {
    let data_dir = settings_dir()?;
    if let Err(error) = fs::create_dir_all(&data_dir) {
        log_warn_fallback(&format!(
            "cannot create data dir {}: {error}",
            data_dir.display()
        ));
    }
    let settings = load_or_init(&settings_file_path(&data_dir))?;

    let logging = match init_logging(&data_dir, settings.log_keep_days) {
        Ok(guard) => Some(guard),
        Err(error) => {
            log_warn_fallback(&format!("logging disabled: {error}"));
            None
        }
    };

    let catalog = PathCatalog::from_settings(&settings)?;
    let staging_root = settings.staging_root(&data_dir);
    tracing::info!(
        event = "bootstrap_completed",
        data_dir = %sanitize_path(&data_dir),
        staging_root = %sanitize_path(&staging_root),
        roots = catalog.entries().len()
    );
    Ok(AppContext {
        engine: RemoverEngine::new(catalog, settings, staging_root),
        cancel: CancelFlag::new(),
        _logging: logging,
    })
}

/// First Ctrl-C requests cancellation; work stops at the next unit boundary.
pub(crate) fn install_cancel_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(event = "cancel_requested");
            eprintln!("cancelling, finishing the current item...");
            cancel.cancel();
        }
    });
}

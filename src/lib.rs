mod bootstrap;
mod cli;
mod commands;
mod render;

use clap::Parser;
use remover_contracts::AppError;
use std::process::ExitCode;

pub use cli::{Cli, Command, TargetArgs};

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            let error = AppError::new("runtime_start_failed", "Failed to start async runtime")
                .with_source(error);
            return commands::error_exit(&error, json);
        }
    };

    runtime.block_on(async move {
        let context = match bootstrap::bootstrap() {
            Ok(context) => context,
            Err(error) => return commands::error_exit(&error, json),
        };
        bootstrap::install_cancel_handler(context.cancel.clone());
        match commands::dispatch(cli, &context).await {
            Ok(code) => code,
            Err(error) => {
                tracing::error!(event = "command_failed", code = %error.code, error = %error);
                commands::error_exit(&error, json)
            }
        }
    })
}

use clap::{Args, Parser, Subcommand};
use remover_contracts::models::ApplicationReference;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "app-remover")]
#[command(author, version, about = "Find and remove what applications leave behind")]
pub struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List installed applications
    Apps,
    /// Show residual files of an application without touching them
    Scan {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Remove an application's residual files
    Remove {
        #[command(flatten)]
        target: TargetArgs,
        /// Delete immediately instead of staging for restore
        #[arg(long)]
        permanent: bool,
        /// Also remove entries classified as caution
        #[arg(long, conflicts_with = "reset")]
        include_caution: bool,
        /// Keep the application bundle and clear only its data
        #[arg(long)]
        reset: bool,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Put a staged batch back where it came from
    Restore {
        /// Batch id printed by `remove`
        batch_id: String,
    },
    /// List staged batches awaiting restore or purge
    Batches,
    /// Delete staged batches older than the retention window
    Purge,
    /// List data left behind by applications that are no longer installed
    Orphans {
        /// Remove these listed entries
        #[arg(long, num_args = 1.., value_name = "PATH")]
        remove: Vec<PathBuf>,
        /// Delete immediately instead of staging for restore
        #[arg(long, requires = "remove")]
        permanent: bool,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// List launch agents, daemons and autostart entries
    Startup {
        /// Unload and remove these listed items
        #[arg(long, num_args = 1.., value_name = "PATH", conflicts_with = "disable")]
        remove: Vec<PathBuf>,
        /// Unload this item and keep it from starting again; the file stays
        #[arg(long, value_name = "PATH")]
        disable: Option<PathBuf>,
        /// Delete immediately instead of staging for restore
        #[arg(long, requires = "remove")]
        permanent: bool,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Application path (e.g. /Applications/Foo.app) or display name
    pub target: String,

    /// Bundle identifier, when known
    #[arg(long)]
    pub bundle_id: Option<String>,
}

impl TargetArgs {
    /// An existing path or anything ending in `.app` is treated as an
    /// install location; everything else is a display name.
    pub fn to_reference(&self) -> ApplicationReference {
        let target = self.target.trim();
        let looks_like_path = Path::new(target).exists()
            || Path::new(target)
                .extension()
                .and_then(|value| value.to_str())
                .is_some_and(|value| value.eq_ignore_ascii_case("app"));
        let mut reference = if looks_like_path {
            ApplicationReference::from_install_path(PathBuf::from(target))
        } else {
            ApplicationReference::named(target)
        };
        if let Some(bundle_id) = self.bundle_id.as_deref() {
            reference = reference.with_bundle_id(bundle_id.trim());
        }
        reference
    }
}

#[cfg(test)]
#[path = "../tests/cli/cli_tests.rs"]
mod cli_tests;

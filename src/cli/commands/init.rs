//! Implementation of the `devloop init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::display::{action_skipped, action_success};
use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::setup::{init_project, SetupPaths};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub written: bool,
    pub config_file: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let path = self.config_file.display();
        if self.written {
            action_success(&format!("Wrote {path}"))
        } else {
            action_skipped(&format!("{path} already exists. Use --force to overwrite."))
        }
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let root = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let paths = SetupPaths::in_dir(&root);
    let force = args.force;
    let setup = paths.clone();
    let written = tokio::task::spawn_blocking(move || init_project(&setup, force))
        .await
        .context("init task panicked")??;

    output(
        &InitOutput {
            written,
            config_file: paths.config_file,
        },
        json_mode,
    );
    Ok(())
}

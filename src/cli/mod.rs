//! Command-line interface.
//!
//! Clap definitions live here; each subcommand's arguments and handler live
//! in [`commands`].

pub mod commands;
pub mod display;
pub mod output;

use clap::{Parser, Subcommand};
use console::style;

use commands::{DevelopArgs, DomainsArgs, InitArgs, MaintainArgs, WorkerArgs};

#[derive(Parser, Debug)]
#[command(name = "devloop")]
#[command(about = "devloop - quality-gated development pipelines", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default .devloop/config.yaml
    Init(InitArgs),

    /// Inspect the domain registry
    Domains(DomainsArgs),

    /// Run one task through a domain pipeline
    Develop(DevelopArgs),

    /// Poll the work queue and route items to recipes until interrupted
    Worker(WorkerArgs),

    /// Run the periodic maintenance routine until interrupted
    Maintain(MaintainArgs),
}

impl Commands {
    /// Whether the command reads `.devloop/` configuration.
    ///
    /// `init` runs without it so a broken config file can be rewritten.
    pub const fn needs_config(&self) -> bool {
        !matches!(self, Self::Init(_))
    }
}

/// Print a command failure to stderr.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{body}");
    } else {
        eprintln!("{} {err:#}", style("error:").red().bold());
    }
}

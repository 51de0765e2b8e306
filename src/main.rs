//! devloop CLI entry point.

use clap::Parser;

use devloop::cli::{commands, handle_error, Cli, Commands};
use devloop::infrastructure::logging::LoggerImpl;
use devloop::{Config, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = if cli.command.needs_config() {
        match ConfigLoader::load() {
            Ok(config) => config,
            Err(err) => {
                handle_error(&err, cli.json);
                std::process::exit(2);
            }
        }
    } else {
        Config::default()
    };

    let logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, cli.json).await,
        Commands::Domains(args) => commands::domains::execute(args, cli.json).await,
        Commands::Develop(args) => commands::develop::execute(args, &config, cli.json).await,
        Commands::Worker(args) => commands::worker::execute(args, &config, cli.json).await,
        Commands::Maintain(args) => commands::maintain::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
        drop(logger);
        std::process::exit(1);
    }
}

//! CLI command implementations.

pub mod develop;
pub mod domains;
pub mod init;
pub mod maintain;
pub mod worker;

pub use develop::DevelopArgs;
pub use domains::DomainsArgs;
pub use init::InitArgs;
pub use maintain::MaintainArgs;
pub use worker::WorkerArgs;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::{CommandJudge, TracingCheckpointSink};
use crate::domain::models::Config;
use crate::services::Collaborators;

/// Judge and checkpoint sink built from the loaded configuration.
pub(crate) fn collaborators(config: &Config) -> anyhow::Result<Collaborators> {
    let judge = CommandJudge::from_config(&config.judge)?;
    Ok(Collaborators::new(Arc::new(judge)).with_checkpoints(Arc::new(TracingCheckpointSink)))
}

/// Token cancelled on the first Ctrl-C.
pub(crate) fn stop_on_ctrl_c() -> CancellationToken {
    let stop = CancellationToken::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            trigger.cancel();
        }
    });
    stop
}

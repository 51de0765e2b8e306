//! Implementation of the `devloop develop` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::collaborators;
use crate::cli::display::{colorize_score, colorize_verdict, label, section_header};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{
    Aspect, Config, QualityOverrides, QualityToggle, Task, Work, WorkingMemory,
};
use crate::services::{assemble, Develop, DevelopOptions};

#[derive(Args, Debug)]
pub struct DevelopArgs {
    /// Domain name or alias; unknown names run as backend
    pub domain: String,

    /// Task description
    pub task: String,

    /// Skip the quality gate
    #[arg(long)]
    pub no_quality: bool,

    /// Emit checkpoints for planning, research, spec and tests
    #[arg(long)]
    pub checkpoint: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopOutput {
    pub run_id: Uuid,
    pub domain: String,
    pub stages: Vec<&'static str>,
    pub work: Work,
}

impl CommandOutput for DevelopOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} {}", label("Run"), self.run_id),
            format!("{} {}", label("Domain"), self.domain),
            format!("{} {}", label("Stages"), self.stages.join(" > ")),
        ];
        match &self.work.quality {
            Some(report) => lines.push(format!(
                "{} {} with {} after {} of {} attempt(s)",
                label("Quality"),
                colorize_verdict(report.verdict),
                colorize_score(report.score, report.threshold),
                report.attempt,
                report.attempts
            )),
            None => lines.push(format!("{} not gated", label("Quality"))),
        }
        lines.push(section_header("Output"));
        lines.push(render_value(&self.work.output));
        lines.join("\n")
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

/// Quality toggle for the run: off when asked, the configured overrides when
/// any are set, else the domain defaults.
fn quality_toggle(args: &DevelopArgs, config: &Config) -> QualityToggle {
    if args.no_quality {
        return QualityToggle::Off;
    }
    let settings = &config.quality;
    if settings.threshold.is_none() && settings.max_iters.is_none() {
        return QualityToggle::On;
    }
    QualityToggle::Custom(QualityOverrides {
        threshold: settings.threshold,
        max_iters: settings.max_iters,
        ..Default::default()
    })
}

pub async fn execute(args: DevelopArgs, config: &Config, json_mode: bool) -> Result<()> {
    let collaborators = collaborators(config)?;
    let options = DevelopOptions::new()
        .with_checkpoint(args.checkpoint || config.checkpoints.enabled)
        .with_quality(quality_toggle(&args, config));
    let pipeline = assemble(&args.domain, options, &collaborators);

    let domain = pipeline.domain();
    let stages: Vec<&'static str> = domain
        .profile()
        .stages
        .iter()
        .filter(|aspect| pipeline.enabled().is_enabled(**aspect))
        .map(Aspect::as_str)
        .collect();

    let run_id = Uuid::new_v4();
    let span = info_span!("develop", %run_id, %domain);
    let work = async {
        info!(stages = stages.len(), gated = pipeline.quality().is_enabled(), "starting run");
        let mut memory = WorkingMemory::new();
        pipeline
            .develop(&Task::from(args.task.as_str()), &mut memory)
            .await
    }
    .instrument(span)
    .await?;

    output(
        &DevelopOutput {
            run_id,
            domain: domain.to_string(),
            stages,
            work,
        },
        json_mode,
    );
    Ok(())
}

//! Domain registry introspection commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::display::{label, list_table, render_list, section_header};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{planning_pack, Aspect, DomainKind, EnabledAspects};

#[derive(Args, Debug)]
pub struct DomainsArgs {
    #[command(subcommand)]
    pub command: DomainsCommands,
}

#[derive(Subcommand, Debug)]
pub enum DomainsCommands {
    /// List every domain with its stage order and gate defaults
    List,
    /// Show one domain, its criteria and planning pack
    Show {
        /// Domain name or alias
        domain: String,
    },
}

#[derive(Debug, Serialize)]
pub struct DomainSummary {
    pub name: &'static str,
    pub stages: Vec<&'static str>,
    pub threshold: f64,
    pub max_iters: u32,
    pub criteria: &'static str,
}

impl From<DomainKind> for DomainSummary {
    fn from(domain: DomainKind) -> Self {
        let profile = domain.profile();
        Self {
            name: domain.as_str(),
            stages: profile.stages.iter().map(Aspect::as_str).collect(),
            threshold: profile.threshold,
            max_iters: profile.max_iters,
            criteria: profile.criteria.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DomainListOutput {
    pub domains: Vec<DomainSummary>,
}

impl CommandOutput for DomainListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "stages", "threshold", "max iters", "criteria"]);
        for domain in &self.domains {
            table.add_row(vec![
                domain.name.to_string(),
                truncate(&domain.stages.join(" > "), 60),
                format!("{:.2}", domain.threshold),
                domain.max_iters.to_string(),
                domain.criteria.to_string(),
            ]);
        }
        render_list("domain", &table, self.domains.len())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainDetailOutput {
    #[serde(flatten)]
    pub summary: DomainSummary,
    /// Gate criteria with every stage of the domain enabled.
    pub gate_criteria: Vec<String>,
    pub failure_modes: Vec<String>,
    pub planning_criteria: Vec<String>,
}

impl CommandOutput for DomainDetailOutput {
    fn to_human(&self) -> String {
        let bullets = |items: &[String]| {
            items
                .iter()
                .map(|item| format!("  - {item}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut lines = vec![
            format!("{} {}", label("Domain"), self.summary.name),
            format!("{} {}", label("Stages"), self.summary.stages.join(" > ")),
            format!(
                "{} {:.2} (max {} iterations)",
                label("Threshold"),
                self.summary.threshold,
                self.summary.max_iters
            ),
            section_header("Gate criteria"),
            bullets(&self.gate_criteria),
        ];
        if !self.failure_modes.is_empty() {
            lines.push(section_header("Failure modes"));
            lines.push(bullets(&self.failure_modes));
        }
        if !self.planning_criteria.is_empty() {
            lines.push(section_header("Planning criteria"));
            lines.push(bullets(&self.planning_criteria));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: DomainsArgs, json_mode: bool) -> Result<()> {
    match args.command {
        DomainsCommands::List => {
            let domains = DomainKind::ALL.into_iter().map(DomainSummary::from).collect();
            output(&DomainListOutput { domains }, json_mode);
        }
        DomainsCommands::Show { domain } => {
            output(&describe(&domain)?, json_mode);
        }
    }
    Ok(())
}

fn describe(name: &str) -> Result<DomainDetailOutput> {
    let domain = DomainKind::parse(name).ok_or_else(|| {
        anyhow!(
            "unknown domain '{name}' (known: {})",
            crate::domain::models::list_domains().join(", ")
        )
    })?;

    let profile = domain.profile();
    let enabled: EnabledAspects = profile.stages.iter().map(|aspect| (*aspect, true)).collect();
    let pack = planning_pack(domain)?;
    let planning_criteria = crate::domain::models::PackRegistry::bundled()?.criteria_pack(domain)?;

    Ok(DomainDetailOutput {
        summary: DomainSummary::from(domain),
        gate_criteria: profile.criteria.build(&enabled),
        failure_modes: pack.failure_modes.clone(),
        planning_criteria,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_resolves_aliases() {
        let detail = describe("k8s").unwrap();
        assert_eq!(detail.summary.name, "kubernetes_service");
        assert!(!detail.gate_criteria.is_empty());
    }

    #[test]
    fn test_describe_rejects_unknown_domain() {
        let err = describe("cobol_mainframe").unwrap_err();
        assert!(err.to_string().contains("unknown domain"));
    }

    #[test]
    fn test_list_covers_every_domain() {
        let listing = DomainListOutput {
            domains: DomainKind::ALL.into_iter().map(DomainSummary::from).collect(),
        };
        let json = listing.to_json();
        assert_eq!(json["domains"].as_array().unwrap().len(), DomainKind::ALL.len());
    }
}

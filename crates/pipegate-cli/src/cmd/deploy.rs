use anyhow::bail;
use std::path::Path;

use pipegate_core::config::GateConfig;
use pipegate_core::orchestrate::{DeployOrchestrator, DeployReport, DeployRequest, UnitStatus};

use crate::output;

/// Shared by `deploy` and `verify`: the two differ only in `verify_only`.
pub async fn run(
    config_path: &Path,
    reference: &str,
    version: &str,
    verify_only: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = GateConfig::load(config_path)?;
    let orchestrator = DeployOrchestrator::from_config(&config)?;
    let report = orchestrator
        .run(&DeployRequest {
            revision: reference.to_string(),
            version: version.to_string(),
            verify_only,
        })
        .await?;

    if json {
        output::print_json(&report)?;
    } else {
        print_human(&report);
    }

    match &report {
        DeployReport::Verified { result: false, missing } => {
            bail!("verification failed: {} target(s) missing", missing.len())
        }
        DeployReport::Deployed { outcomes } => {
            let failed = outcomes
                .iter()
                .filter(|o| matches!(o.status, UnitStatus::Failed { .. }))
                .count();
            if failed > 0 {
                bail!("{failed} unit(s) failed to deploy");
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn print_human(report: &DeployReport) {
    match report {
        DeployReport::Verified { result, missing } => {
            if *result {
                println!("all expected targets are deployed");
            } else {
                println!("missing targets:");
                for target in missing {
                    println!("  {target}");
                }
            }
        }
        DeployReport::Deployed { outcomes } => {
            if outcomes.is_empty() {
                println!("no deployable units found");
            }
            for outcome in outcomes {
                match &outcome.status {
                    UnitStatus::Created => println!("{} created", outcome.target),
                    UnitStatus::Updated => println!("{} updated", outcome.target),
                    UnitStatus::Failed { error } => {
                        println!("{} failed: {error}", outcome.target)
                    }
                }
            }
        }
    }
}

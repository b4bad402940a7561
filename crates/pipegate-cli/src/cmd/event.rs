use std::io::Read as _;
use std::path::Path;
use std::sync::Arc;

use pipegate_core::config::GateConfig;
use pipegate_core::event::PipelineEvent;
use pipegate_core::router::{EventRouter, Outcome};

use crate::output;

/// Handle one pipeline event the way the webhook host would — from a file,
/// or from stdin when no file is given.
pub async fn run(config_path: &Path, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let config = Arc::new(GateConfig::load(config_path)?);
    let router = EventRouter::from_config(config)?;

    let outcome = match serde_json::from_str::<PipelineEvent>(&raw) {
        Ok(event) => router.handle(&event).await?,
        Err(_) => Outcome::Ignored {
            reason: "unrecognized event shape".into(),
        },
    };

    if json {
        output::print_json(&outcome)?;
    } else {
        match &outcome {
            Outcome::Ignored { reason } => println!("ignored: {reason}"),
            Outcome::DeployDispatched { revision, version } => {
                println!("deploying {revision} as {version}")
            }
            Outcome::Advanced => println!("verified; pipeline advanced"),
            Outcome::Cancelled { missing } => {
                println!("verification failed; pipeline cancelled");
                for target in missing {
                    println!("  missing {target}");
                }
            }
        }
    }

    // A dispatched deploy runs in the background; hold the process open
    // until it completes.
    router.drain().await;
    Ok(())
}

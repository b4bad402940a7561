use anyhow::bail;
use clap::Subcommand;
use std::path::Path;

use pipegate_core::config::{GateConfig, WarnLevel};

use crate::output;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Load the configuration and report problems
    Check,
}

pub fn run(config_path: &Path, subcommand: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        ConfigSubcommand::Check => check(config_path, json),
    }
}

fn check(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = GateConfig::load(config_path)?;
    let warnings = config.validate();

    if json {
        output::print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!("configuration ok");
    } else {
        for warning in &warnings {
            let level = match warning.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("{level}: {}", warning.message);
        }
    }

    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();
    if errors > 0 {
        bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pipegate",
    about = "Release-pipeline gate — deploy and verify serverless units from pipeline events",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the gate configuration file
    #[arg(long, global = true, env = "PIPEGATE_CONFIG", default_value = "pipegate.yaml")]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and deploy every unit found at a revision
    Deploy {
        /// Branch, tag, or commit to deploy
        #[arg(long = "ref")]
        reference: String,

        /// Release version qualifying every deployment-target name
        #[arg(long)]
        version: String,
    },

    /// Check that every expected target is deployed, without deploying
    Verify {
        /// Branch, tag, or commit holding the expected units
        #[arg(long = "ref")]
        reference: String,

        /// Release version the targets must carry
        #[arg(long)]
        version: String,
    },

    /// Handle one pipeline event from a file (or stdin)
    Event {
        /// Event JSON file; stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Run the webhook server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3141")]
        port: u16,
    },

    /// Inspect the gate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Deploy { reference, version } => {
            cmd::deploy::run(&cli.config, &reference, &version, false, cli.json).await
        }
        Commands::Verify { reference, version } => {
            cmd::deploy::run(&cli.config, &reference, &version, true, cli.json).await
        }
        Commands::Event { file } => cmd::event::run(&cli.config, file.as_deref(), cli.json).await,
        Commands::Serve { port } => cmd::serve::run(&cli.config, port).await,
        Commands::Config { subcommand } => cmd::config::run(&cli.config, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use outreach::config::OutreachConfig;
use outreach::logging::{self, LogFormat};
use outreach::ui::UiMode;

mod cmd;

#[derive(Parser)]
#[command(name = "outreach")]
#[command(version, about = "Track campaign enrollment progress from the terminal")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Log line format on stderr: text or json. Overrides outreach.toml.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Synthetic processing time per lead, in seconds. Overrides env and outreach.toml.
    #[arg(long, global = true)]
    pub seconds_per_item: Option<f64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the configured phase catalog
    Phases,
    /// Compute a single progress reading without running a session
    Simulate {
        /// Number of items in the batch
        #[arg(long)]
        items: u32,
        /// Seconds elapsed since the batch started
        #[arg(long)]
        elapsed: f64,
        /// Print the reading as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a session for a batch and track it until it completes
    Track {
        #[arg(long)]
        campaign_id: String,
        #[arg(long)]
        campaign_name: Option<String>,
        /// Number of items in the batch
        #[arg(long)]
        items: u32,
        /// UI mode: full, minimal, json
        #[arg(long, default_value = "full")]
        ui: String,
        /// Number of independent progress surfaces to mount
        #[arg(long, default_value = "1")]
        surfaces: usize,
    },
    /// Submit leads to a campaign workflow, then track the batch
    Enroll {
        /// Workflow webhook URL. Overrides env and outreach.toml.
        #[arg(long)]
        webhook: Option<String>,
        #[arg(long)]
        campaign_id: String,
        #[arg(long)]
        campaign_name: Option<String>,
        /// JSON file holding an array of leads
        #[arg(long)]
        leads: PathBuf,
        /// UI mode: full, minimal, json
        #[arg(long, default_value = "full")]
        ui: String,
    },
    /// View, validate, or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the configuration file and effective values
    Show,
    /// Validate outreach.toml
    Validate,
    /// Create a default outreach.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = OutreachConfig::new(project_dir.clone());
    let (level, format) = match &config {
        Ok(config) => (config.toml.logging.level.clone(), config.toml.logging.format),
        Err(_) => ("warn".to_string(), LogFormat::default()),
    };
    logging::init(&level, cli.log_format.unwrap_or(format), cli.verbose);

    match &cli.command {
        Commands::Phases => cmd::cmd_phases(&config?),
        Commands::Simulate {
            items,
            elapsed,
            json,
        } => {
            let config = config?.with_cli_overrides(cli.seconds_per_item, None);
            cmd::cmd_simulate(&config, *items, *elapsed, *json)?;
        }
        Commands::Track {
            campaign_id,
            campaign_name,
            items,
            ui,
            surfaces,
        } => {
            let config = config?.with_cli_overrides(cli.seconds_per_item, None);
            cmd::cmd_track(
                &config,
                campaign_id,
                campaign_name.as_deref(),
                *items,
                UiMode::parse(ui),
                *surfaces,
            )
            .await?;
        }
        Commands::Enroll {
            webhook,
            campaign_id,
            campaign_name,
            leads,
            ui,
        } => {
            let config = config?.with_cli_overrides(cli.seconds_per_item, webhook.clone());
            cmd::cmd_enroll(
                &config,
                campaign_id,
                campaign_name.as_deref(),
                leads,
                UiMode::parse(ui),
            )
            .await?;
        }
        // Works from the raw file, so an invalid env override doesn't block it.
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}

//! Configuration view and validation commands: `outreach config`.

use anyhow::{Context, Result};
use std::path::Path;

use super::super::ConfigCommands;
use outreach::config::{OutreachConfig, OutreachToml, get_config_dir};

fn print_toml(toml: &OutreachToml) {
    println!("[progress]");
    println!("  seconds_per_item = {}", toml.progress.seconds_per_item);
    println!("  tick_interval_ms = {}", toml.progress.tick_interval_ms);
    println!();

    println!("[enrollment]");
    match &toml.enrollment.webhook_url {
        Some(url) => println!("  webhook_url = \"{}\"", url),
        None => println!("  webhook_url = (not set)"),
    }
    println!();

    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    println!("  format = \"{}\"", toml.logging.format);
    println!();

    println!("[[phases]]");
    for phase in &toml.phases {
        println!("  {} {}", phase.color, phase.name);
    }
    println!();
}

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_dir = get_config_dir(project_dir);
    let config_path = config_dir.join("outreach.toml");

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Outreach Configuration");
            println!("======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                let toml = OutreachToml::load(&config_path)?;
                print_toml(&toml);
            } else {
                println!("No outreach.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                println!();
                print_toml(&OutreachToml::default());
                println!("Run 'outreach config init' to create an outreach.toml file.");
                println!();
            }

            // Effective values include env overrides.
            let config = OutreachConfig::new(project_dir.to_path_buf())?;
            println!("Effective values (with env overrides):");
            println!("  seconds_per_item = {}", config.seconds_per_item());
            println!(
                "  tick_interval_ms = {}",
                config.tick_interval().as_millis()
            );
            println!(
                "  webhook_url = {}",
                config.webhook_url().unwrap_or("(not set)")
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No outreach.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = OutreachToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("outreach.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create {}", config_dir.display()))?;

            OutreachToml::default().save(&config_path)?;

            println!("Created outreach.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [progress] seconds_per_item, tick_interval_ms");
            println!("  - [enrollment] webhook_url");
            println!("  - [logging] level, format");
            println!("  - [[phases]] name, color");
            println!();
        }
    }

    Ok(())
}

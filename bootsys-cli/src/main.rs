mod errors;
mod prompt;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    errors::{CliError, Result},
    prompt::TerminalPrompt,
};
use bootsys_core::config::{format_duration, parse_duration, BootsysConfig};
use bootsys_core::groups::StaticInventory;
use bootsys_core::remote::SshConnector;
use bootsys_core::storage::CephCli;
use bootsys_core::{PlatformAction, PlatformSequencer};
use clap::Parser;
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// bootsys - start and stop platform services across the management nodes
#[derive(Parser, Debug)]
#[command(name = "bootsys")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Per-host timeout for each service start/stop (e.g. "30s", "2m")
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Action to perform on the platform services: start or stop
    #[arg(value_name = "ACTION")]
    pub action: String,
}

impl Cli {
    pub fn action(&self) -> Result<PlatformAction> {
        Ok(self.action.parse()?)
    }
}

#[tokio::main]
async fn main() {
    let result = match Cli::try_parse() {
        Ok(cli) => run(cli).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        match &e {
            // clap renders its own usage, help and version text
            CliError::Usage(usage) => {
                let _ = usage.print();
            }
            other => eprintln!("{} {}", "Error:".red().bold(), other),
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let action = cli.action()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = BootsysConfig::resolve_config_path(cli.file.as_deref())?;
    let mut config = BootsysConfig::load(&config_path)?;
    debug!("Using config {}", config_path.display());

    if let Some(timeout) = cli.timeout {
        if timeout.is_zero() {
            return Err(bootsys_core::PlatformError::Config(
                "--timeout must be greater than zero".to_string(),
            )
            .into());
        }
        config.services.action_timeout = timeout;
    }
    debug!(
        "Per-host service timeout {}, poll interval {}",
        format_duration(&config.services.action_timeout),
        format_duration(&config.services.poll_interval)
    );

    let connector = Arc::new(SshConnector::new(config.ssh.clone()));
    let storage = CephCli::new(&config.storage);
    let inventory = StaticInventory::from(&config.inventory);
    let prompt = TerminalPrompt::stdio();

    PlatformSequencer::new(connector, storage)
        .with_timing(&config.services)
        .run(action, &inventory, &prompt)
        .await?;

    println!("{}", format!("Platform {} completed on all nodes.", action).green());
    Ok(())
}

//! CLI module for buildfeed.
//!
//! Subcommands:
//! - `notify <build.json>` - Classify a finished build and post its status
//! - `preview <build.json>` - Show the message that would be posted
//! - `classify` - Classify a pair of verdicts
//! - `config check` - Validate configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::build::{BuildRecord, Verdict};
use crate::config::Config;
use crate::notifications::{classify, compose_build, Delivery, Notifier, WeiboTransport};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "buildfeed")]
#[command(author, version, about = "Posts build outcomes to a social feed", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "buildfeed.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Weibo access token (overrides the configuration file)
    #[arg(long, env = "BUILDFEED_WEIBO_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a finished build and post its status
    Notify {
        /// Build record JSON file
        build: PathBuf,
    },

    /// Print the message for a build without posting it
    Preview {
        /// Build record JSON file
        build: PathBuf,
    },

    /// Classify a build verdict against the previous one
    Classify {
        /// Verdict of the current build
        #[arg(long)]
        current: Verdict,
        /// Verdict of the previous build, if there was one
        #[arg(long)]
        previous: Option<Verdict>,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Apply command-line overrides on top of the loaded configuration
pub fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(token) = &cli.access_token {
        config.weibo.access_token = Some(token.clone());
    }
}

/// Run a CLI command
pub async fn run_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Notify { build } => notify(config, build).await,
        Commands::Preview { build } => preview(config, build),
        Commands::Classify { current, previous } => {
            println!("{}", classify(*current, *previous));
            Ok(())
        }
        Commands::Config(ConfigCommands::Check) => config_check(config, config_path),
    }
}

async fn notify(config: &Config, build_path: &Path) -> Result<()> {
    let build = BuildRecord::load(build_path)?;

    let transport = match WeiboTransport::new(&config.weibo) {
        Ok(transport) => transport,
        Err(e) => {
            // A broken notifier must not fail the build step
            tracing::error!(error = %e, "Cannot set up weibo transport, skipping notification");
            println!("{} build: not notified ({})", build.outcome(), e);
            return Ok(());
        }
    };

    let notifier = Notifier::new(config.notify.clone(), config.author_directory(), transport);
    match notifier.notify(&build).await {
        Delivery::Disabled { outcome } => {
            println!("{} build: notifications disabled", outcome);
        }
        Delivery::Misconfigured { outcome, error } => {
            println!("{} build: not notified ({})", outcome, error);
        }
        Delivery::Failed {
            outcome,
            message,
            error,
        } => {
            println!("{} build: posting failed ({})", outcome, error);
            println!("  {}", message);
        }
        Delivery::Sent { outcome, message } => {
            println!("{} build: posted", outcome);
            println!("  {}", message);
        }
    }

    Ok(())
}

fn preview(config: &Config, build_path: &Path) -> Result<()> {
    let build = BuildRecord::load(build_path)?;
    let (outcome, message) = compose_build(
        &config.notify.templates,
        &config.author_directory(),
        &build,
        &build.url,
    )
    .with_context(|| format!("Cannot compose message for {} build", build.outcome()))?;

    let state = if config.notify.is_enabled(outcome) {
        "enabled"
    } else {
        "disabled"
    };
    println!("Outcome: {} (notifications {})", outcome, state);
    println!("{}", message);
    Ok(())
}

fn config_check(config: &Config, config_path: &Path) -> Result<()> {
    println!("Checking configuration: {}", config_path.display());
    if !config_path.exists() {
        println!("  (file not found, checking defaults)");
    }

    let problems = config.validate();
    if problems.is_empty() {
        println!("Configuration is valid.");
        return Ok(());
    }

    for problem in &problems {
        println!("  - {}", problem);
    }
    anyhow::bail!("Configuration has {} problem(s)", problems.len())
}

//! Command-line interface for podhost.
//!
//! Provides commands for running the server and inspecting the resolved
//! configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{Config, Overrides};
use crate::server;

/// podhost - Self-hosted podcast publishing
#[derive(Parser, Debug)]
#[command(name = "podhost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ConfigArgs),

    /// Show resolved configuration
    Config(ConfigArgs),
}

/// Settings shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Public base URL of the server (scheme defaults to https)
    #[arg(long, env = "PODHOST_HOST")]
    pub host: Option<String>,

    /// Storage root for the catalog and the podcasts directory
    #[arg(long, env = "PODHOST_ROOT")]
    pub root: Option<PathBuf>,

    /// API credential, `user:password` or a bare password
    #[arg(long, env = "PODHOST_CREDENTIAL", hide_env_values = true)]
    pub credential: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PODHOST_PORT")]
    pub port: Option<u16>,

    /// Directory of the management web UI, served at the base path
    #[arg(long, env = "PODHOST_FRONT")]
    pub front: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    /// Resolve flags, environment and config file into a [`Config`]
    pub fn resolve(self) -> Result<Config> {
        let overrides = Overrides {
            host: self.host,
            root: self.root,
            credential: self.credential,
            port: self.port,
            front: self.front,
        };
        Config::resolve(overrides, self.config.as_deref())
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => server::run(args.resolve()?).await,
            Commands::Config(args) => show_config(args.resolve()?),
        }
    }
}

/// Show the resolved configuration (for debugging)
fn show_config(config: Config) -> Result<()> {
    println!("podhost configuration");
    println!();
    println!("{}", config);
    Ok(())
}

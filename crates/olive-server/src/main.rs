//! olive: server and command-line tools for the olive desktop.
//!
//! # Usage
//!
//! ```bash
//! # Serve the desktop, proxy and document API
//! olive serve --bind 0.0.0.0:3000
//!
//! # Drive the same filesystem the desktop sees
//! olive fs write /notes.txt "hello"
//! olive fs ls /cloud
//!
//! # List installed apps
//! olive apps --all
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use olive_server::cli::{self, FsCommand};
use olive_server::config::OliveConfig;

#[derive(Parser, Debug)]
#[command(name = "olive")]
#[command(version)]
#[command(about = "olive desktop server and filesystem tools", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/olive/config.toml)
    #[arg(long, global = true, env = "OLIVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address, overriding the config
        #[arg(long)]
        bind: Option<String>,
    },

    /// Filesystem operations (`/cloud/...` goes to the server)
    #[command(subcommand)]
    Fs(FsCommand),

    /// List installed apps
    Apps {
        /// Include invisible apps
        #[arg(long)]
        all: bool,

        /// Print full app descriptors as JSON
        #[arg(long)]
        json: bool,

        /// Apps directory, overriding the config
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("olive=info".parse()?))
        .init();

    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => {
            let mut config = OliveConfig::load_from(path)?;
            config.apply_env(|name| std::env::var(name).ok());
            config
        }
        None => OliveConfig::load().context("Failed to load configuration")?,
    };

    match args.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            olive_server::serve(&config.server).await
        }
        Commands::Fs(command) => {
            let session = cli::build_session(&config.client)?;
            let mut stdout = std::io::stdout().lock();
            cli::run_fs(&session, command, &mut stdout).await
        }
        Commands::Apps { all, json, dir } => {
            let dir = dir.unwrap_or(config.server.apps_dir);
            let mut stdout = std::io::stdout().lock();
            cli::run_apps(&dir, all, json, &mut stdout).await
        }
    }
}

//! Tether - start and stop linked container applications
//!
//! This is the CLI entry point for Tether.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tether::application::{Application, Snapshot};
use tether::config::EngineConfig;
use tether::engine::DockerEngine;
use tracing_subscriber::EnvFilter;

/// Tether - dependency-ordered container applications
#[derive(Parser)]
#[command(name = "tether")]
#[command(version)]
#[command(about = "Start and stop linked containers in dependency order", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Engine host (defaults to DOCKER_HOST)
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Engine request timeout in seconds
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an application's services in dependency order
    Up {
        /// Application name
        app: String,
    },

    /// Stop an application's services in reverse dependency order
    Down {
        /// Application name
        app: String,
    },

    /// Print the start order of an application
    Order {
        /// Application name
        app: String,
        /// Print the stop order instead
        #[arg(short, long)]
        reverse: bool,
    },

    /// List an application's services and their containers
    Ps {
        /// Application name
        app: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = EngineConfig::from_env()?;
    if let Some(ref host) = cli.host {
        config = config.host(host)?;
    }
    if let Some(secs) = cli.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }

    let engine = DockerEngine::new(config).context("failed to create engine client")?;

    match cli.command {
        Commands::Up { app } => {
            let snapshot = Snapshot::fetch(&app, &engine).await?;
            let application = Application::from_snapshot(&snapshot)?;
            let progress = application.start_in(&engine, &snapshot).await?;
            println!("Started: {}", progress.completed.join(", "));
        }

        Commands::Down { app } => {
            let snapshot = Snapshot::fetch(&app, &engine).await?;
            let application = Application::from_snapshot(&snapshot)?;
            let progress = application.stop_in(&engine, &snapshot).await?;
            println!("Stopped: {}", progress.completed.join(", "));
        }

        Commands::Order { app, reverse } => {
            let application = Application::from_engine(&app, &engine).await?;
            for name in application.topology(reverse)? {
                println!("{}", name);
            }
            for name in application.external_dependencies()? {
                println!("{} (external)", name);
            }
        }

        Commands::Ps { app } => {
            let snapshot = Snapshot::fetch(&app, &engine).await?;
            let application = Application::from_snapshot(&snapshot)?;
            println!("{:<14} {:<20} {:<12}", "CONTAINER ID", "SERVICE", "STATE");
            for status in application.status_in(&snapshot)? {
                match status.container {
                    Some(c) => println!(
                        "{:<14} {:<20} {:<12}",
                        c.id.chars().take(12).collect::<String>(),
                        status.name,
                        c.state.to_string()
                    ),
                    None => println!("{:<14} {:<20} {:<12}", "-", status.name, "missing"),
                }
            }
        }
    }

    Ok(())
}

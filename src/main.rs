//! Strata CLI - Layered Vector Dataset Engine
//!
//! Developer tool for generating datasets, exercising the engine, and
//! inspecting snapshot files.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use strata::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    info!("Strata v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Strata v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Synthetic {
            path,
            points,
            dimensions,
            clusters,
        } => commands::synthetic(&path, points, dimensions, clusters),
        Commands::Demo { path } => commands::demo(&path),
        Commands::Show { path } => commands::show(&path),
        Commands::List { dir } => commands::list(&dir),
    }
}

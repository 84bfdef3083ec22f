//! Command-line interface definitions.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Strata - layered vector dataset engine.
#[derive(Parser, Debug)]
#[command(name = "strata-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a synthetic clustered dataset and save it as a snapshot.
    Synthetic {
        /// Snapshot file to write.
        path: PathBuf,
        /// Number of points.
        #[arg(long, default_value_t = 1000)]
        points: usize,
        /// Vector dimensionality.
        #[arg(long, default_value_t = 30)]
        dimensions: usize,
        /// Number of clusters.
        #[arg(long, default_value_t = 5)]
        clusters: usize,
    },
    /// Run the demo pipeline (transform + projection) on a snapshot.
    Demo {
        /// Snapshot file to load.
        path: PathBuf,
    },
    /// Print the layers, transformations, and projections of a snapshot.
    Show {
        /// Snapshot file to load.
        path: PathBuf,
    },
    /// List the snapshots in a directory.
    List {
        /// Directory containing snapshot JSON files.
        dir: PathBuf,
    },
}

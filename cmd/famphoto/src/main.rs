//! famphoto - family photo catalog with face-identity linking.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Family photo catalog with face-identity linking.
///
/// Configuration is read from ~/.famphoto/config.yaml when present.
#[derive(Parser, Debug)]
#[command(name = "famphoto")]
#[command(about = "Family photo catalog with face-identity linking")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.famphoto/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog database (overrides the config file)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Clustering distance threshold (overrides the config file)
    #[arg(long, global = true)]
    pub eps: Option<f64>,

    /// Clustering neighborhood size (overrides the config file)
    #[arg(long, global = true)]
    pub min_samples: Option<usize>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a folder of photos and link their faces
    Import {
        /// Folder to scan recursively
        dir: PathBuf,
    },
    /// List known people
    People,
    /// Rename a person
    Rename {
        /// Identity id as shown by `people`
        id: u64,
        /// New display name
        label: String,
    },
    /// List photos by capture date
    Photos {
        /// Only photos of this person
        #[arg(long)]
        person: Option<u64>,
    },
    /// Print the distribution of distances between known people
    Distances {
        /// Number of histogram bins
        #[arg(long, default_value_t = 20)]
        bins: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let cfg = commands::resolve_config(&cli)?;
    match &cli.command {
        Commands::Import { dir } => commands::import(&cfg, dir),
        Commands::People => commands::people(&cfg),
        Commands::Rename { id, label } => commands::rename(&cfg, *id, label),
        Commands::Photos { person } => commands::photos(&cfg, *person),
        Commands::Distances { bins } => commands::distances(&cfg, *bins),
    }
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use corpus_qa::commands::{add, ask, build, init_config, reset, search, show_config, status};
use corpus_qa::config::{Config, default_base_dir};

#[derive(Parser)]
#[command(name = "corpus-qa")]
#[command(about = "Retrieval-grounded question answering over a managed text corpus")]
#[command(version)]
struct Cli {
    /// Base directory for config, data, and index artifacts
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from persisted state or the initial corpus
    Build,
    /// Add a JSON batch file to the index
    Add {
        /// Path to the batch file (three columns: primary id, secondary id, text)
        file: PathBuf,
    },
    /// Search the index for the nearest texts
    Search {
        /// Query text
        query: String,
    },
    /// Answer a question grounded in the indexed corpus
    Ask {
        /// The question to answer
        query: String,
    },
    /// Delete all persisted index artifacts
    Reset,
    /// Show persisted index and Ollama server status
    Status,
    /// Initialize or show the configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(dir) => dir,
        None => default_base_dir()?,
    };
    let config = Config::load(&base_dir)?;

    match cli.command {
        Commands::Build => build(&config)?,
        Commands::Add { file } => add(&config, &file)?,
        Commands::Search { query } => search(&config, &query)?,
        Commands::Ask { query } => ask(&config, &query)?,
        Commands::Reset => reset(&config)?,
        Commands::Status => status(&config)?,
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                init_config(&config)?;
            }
        }
    }

    Ok(())
}

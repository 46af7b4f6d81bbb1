use anyhow::Result;
use clap::{Parser, Subcommand};
use sharepoint_qa::commands::{ask, rebuild_index, show_status};
use sharepoint_qa::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sharepoint-qa")]
#[command(about = "Answer questions about a SharePoint site using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the index (defaults to ~/.sharepoint-qa)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Microsoft Graph and OpenAI settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ask questions interactively, building the index first if needed
    Ask,
    /// Rebuild the index from SharePoint
    Index,
    /// Show the state of the index on disk
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ask => {
            ask(&config_dir)?;
        }
        Commands::Index => {
            rebuild_index(&config_dir)?;
        }
        Commands::Status => {
            show_status(&config_dir)?;
        }
    }

    Ok(())
}

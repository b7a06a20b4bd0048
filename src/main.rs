use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use doc_rag::commands::{ask, health, serve};
use doc_rag::config::{Config, get_config_dir, show_config};

#[derive(Parser)]
#[command(name = "doc-rag")]
#[command(about = "Answer questions about PDF and DOCX documents with a local RAG pipeline")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.doc-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Override the configured listen address
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer questions about a single document
    Ask {
        /// Document URL or local PDF/DOCX path
        document: String,
        /// Question to answer; repeat for several
        #[arg(short, long = "question", required = true)]
        questions: Vec<String>,
        /// Print answers as JSON
        #[arg(long)]
        json: bool,
        /// Treat the local document as already-extracted plain text
        #[arg(long)]
        text: bool,
    },
    /// Check that Ollama is reachable and the models are installed
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
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
                let config = Config::load(&config_dir)?;
                config.save()?;
                println!(
                    "Configuration written to {}",
                    config.config_file_path().display()
                );
            }
        }
        Commands::Serve { host, port } => {
            serve(Config::load(&config_dir)?, host, port).await?;
        }
        Commands::Ask {
            document,
            questions,
            json,
            text,
        } => {
            let config = Config::load(&config_dir)?;
            tokio::task::spawn_blocking(move || ask(&config, &document, &questions, json, text))
                .await??;
        }
        Commands::Health => {
            health(&Config::load(&config_dir)?)?;
        }
    }

    Ok(())
}

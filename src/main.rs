//! # docqa CLI
//!
//! Terminal client for a document question-answering backend.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa chat` | Interactive session; upload with `/upload PATH` |
//! | `docqa ask --file PATH "<question>"` | Upload one file and ask one question |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` or the
//! `[logging].filter` key.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use docqa::backend::HttpBackend;
use docqa::{chat_cmd, config};

/// docqa: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa: ask questions about your documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    /// Override `backend.base_url` from the config file.
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session.
    ///
    /// Type questions at the prompt; `/help` lists the session commands.
    Chat {
        /// Upload this file before the first prompt.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Upload a file, ask one question, and print the answer.
    ///
    /// Exits non-zero if the upload or the query fails.
    Ask {
        /// Document to upload.
        #[arg(long)]
        file: PathBuf,

        /// The question to ask.
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };
    if let Some(url) = cli.backend_url {
        cfg.backend.base_url = url;
        config::validate(&cfg)?;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(backend = %cfg.backend.base_url, "configuration loaded");
    let backend = Arc::new(HttpBackend::new(&cfg.backend)?);

    match cli.command {
        Commands::Chat { file } => {
            chat_cmd::run_chat(&cfg, backend, file).await?;
        }
        Commands::Ask { file, question } => {
            chat_cmd::run_ask(&cfg, backend, &file, &question).await?;
        }
    }

    Ok(())
}

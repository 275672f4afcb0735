//! # Studyhall CLI (`study`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `study init` | Create the SQLite database and run schema migrations |
//! | `study serve` | Start the HTTP API server |
//! | `study extract <path>` | Extract text from a local file and print it |
//!
//! All commands accept a `--config` flag pointing to a TOML configuration
//! file. See `config/studyhall.example.toml` for a full example.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use studyhall::{config, db, extract, migrate, server};

/// Studyhall: course-notes backend with lecture-note text extraction and
/// LLM context assembly.
#[derive(Parser)]
#[command(
    name = "study",
    about = "Studyhall: course-notes backend with text extraction and LLM chat",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/studyhall.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Start the HTTP API server.
    Serve,

    /// Extract text from a local file and print it to stdout.
    ///
    /// Debugging aid for the extraction pipeline; uses the same dispatcher
    /// and per-format extractors as uploads.
    Extract {
        /// File to extract (`.docx`, `.pdf`, or `.txt`).
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config.db).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("initialized {}", config.db.path.display());
        }
        Commands::Serve => {
            server::run_server(&config).await?;
        }
        Commands::Extract { path } => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = std::fs::read(&path)?;
            match extract::extract_text(&file_name, &bytes, config.unsupported_policy()) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

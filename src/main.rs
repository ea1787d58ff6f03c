//! # Quillpress CLI (`quill`)
//!
//! The `quill` binary is the operational interface for Quillpress. It
//! provides commands for database initialization, searching from the
//! shell, a database overview, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! quill --config ./config/quill.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quill init` | Create the SQLite database and run schema migrations |
//! | `quill search "<term>"` | Simple search over active articles |
//! | `quill stats` | Database overview (articles, comments, tags) |
//! | `quill serve` | Start the HTTP server |

mod articles;
mod categories;
mod comments;
mod config;
mod db;
mod forms;
mod migrate;
mod models;
mod pagination;
mod search;
mod server;
mod stats;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Quillpress CLI — a lightweight article and comment CMS.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/quill.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "quill",
    about = "Quillpress — a lightweight article and comment CMS",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/quill.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (articles, comments, categories, tags, article_tags). This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Search active articles.
    ///
    /// Runs the simple search (title/author contains, tag name equals)
    /// and prints matches newest-first.
    Search {
        /// The search term.
        term: String,
    },

    /// Print a database overview.
    ///
    /// Shows article counts by status, comment/category/tag counts,
    /// database size, and the most-used tags.
    Stats,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// the article API endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Search { term } => {
            search::run_search(&cfg, &term).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

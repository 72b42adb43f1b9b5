use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use encore_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "encore", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the database (default: ~/.local/share/encore/encore.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Collect, store and embed setlists for a set of artists
    ///
    /// For each artist:
    ///
    /// - Searches setlist.fm and takes the most relevant match
    /// - Pages through their setlists (one request per second)
    /// - Saves the raw pages as JSON under the raw data directory
    /// - Normalizes and stores each setlist (duplicates are skipped)
    ///
    /// Finally every stored setlist that is not yet searchable is embedded.
    /// Re-running setup is safe: existing setlists and embeddings are kept.
    ///
    /// Requires SETLISTFM_API_KEY and OPENAI_API_KEY.
    Setup {
        /// Artists to collect (default: from config)
        #[arg(long, num_args = 1..)]
        artists: Vec<String>,

        /// Maximum setlists per artist
        #[arg(long)]
        max_setlists: Option<usize>,
    },
    /// Ask a single question and print the answer
    Ask {
        /// The question, e.g. "Which shows had Dark Star?"
        question: String,

        /// Show which setlists were retrieved
        #[arg(short, long)]
        verbose: bool,
    },
    /// Start an interactive question session (the default)
    Chat {
        /// Start with retrieval details shown
        #[arg(short, long)]
        verbose: bool,
    },
    /// Embed stored setlists that are not yet searchable
    Embed,
    /// Show database and index statistics
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Create a config file with example values
    Init,
    /// Print an example config file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.db {
        Some(db_path) => Config::load_with_db_path(db_path)?,
        None => Config::load()?,
    };

    match cli.command.unwrap_or(Commands::Chat { verbose: false }) {
        Commands::Setup {
            artists,
            max_setlists,
        } => {
            commands::run_setup(&config, artists, max_setlists).await?;
        }
        Commands::Ask { question, verbose } => {
            commands::run_ask(&config, &question, verbose).await?;
        }
        Commands::Chat { verbose } => {
            commands::run_chat(&config, verbose).await?;
        }
        Commands::Embed => {
            commands::run_embed(&config).await?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Init => commands::config::init_config()?,
            ConfigAction::Example => commands::config::show_example(),
        },
    }

    Ok(())
}

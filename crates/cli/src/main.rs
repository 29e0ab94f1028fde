//! reactkit CLI — interactive widgets in the terminal.
//!
//! Commands:
//! - `pages`   — Page through text with ⏪/⏩
//! - `rate`    — Vote on a track with 👍/👎/💩
//! - `choose`  — Ask a question and wait for a numbered reply
//! - `config`  — Show, create or locate the configuration file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reactkit",
    about = "reactkit — reaction-driven interactive messages",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show pages one at a time, navigated with reactions
    Pages {
        /// Page bodies, in order
        #[arg(required = true)]
        pages: Vec<String>,

        /// Page title shown above every page
        #[arg(short, long, default_value = "reactkit")]
        title: String,

        /// Close after this many seconds instead of the configured ttl
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Show a track and collect votes on it
    Rate {
        /// Track title
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        artist: Option<String>,

        /// Starting rating
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        rating: i64,

        /// Close after this many seconds instead of the configured ttl
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// List options and wait for the reply naming one of them
    Choose {
        /// Options to choose from
        #[arg(required = true)]
        options: Vec<String>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the config file path
    Path,
    /// Check the configuration for errors
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Pages { pages, title, ttl } => commands::pages::run(pages, title, ttl).await?,
        Commands::Rate {
            title,
            artist,
            rating,
            ttl,
        } => commands::rate::run(title, artist, rating, ttl).await?,
        Commands::Choose { options } => commands::choose::run(options).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}

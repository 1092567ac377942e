use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod commands;
mod server;
mod services;

#[derive(Debug, Parser)]
#[command(name = "marquee", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ~/.config/marquee/config.toml)
    #[arg(long, global = true, env = "MARQUEE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Serve the HTTP API
    ///
    /// Ensures the vector index exists once at startup, then serves:
    ///
    /// - GET /healthz
    /// - GET /get-episode-data   sync every configured library section
    /// - GET /querydb?query=<text>&model=<model>   answer a request
    Serve {
        /// Address to bind (overrides `bind` in the config file)
        #[arg(long)]
        bind: Option<String>,

        /// Keep vectors in process memory instead of Pinecone
        #[arg(long)]
        in_memory_index: bool,
    },
    /// Index a library section, or every configured section
    ///
    /// Each record is described, embedded, and upserted in batches. Records
    /// that cannot be embedded are skipped and counted; a failed upsert
    /// stops the run and prints what was confirmed before it.
    Sync {
        /// Library section title (e.g. "Movies")
        #[arg(long)]
        section: Option<String>,
    },
    /// Ask for a recommendation from the indexed library
    Query {
        /// What you feel like watching
        text: String,

        /// Chat model (gpt-3.5-turbo, gpt-4, gpt-4-turbo, gpt-4o, gpt-4o-mini)
        #[arg(long)]
        model: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommands {
    /// Create the config file with commented defaults
    Init,
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
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
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve {
            bind,
            in_memory_index,
        } => {
            commands::serve::run_serve(config_path, bind, in_memory_index).await?;
        }
        Commands::Sync { section } => {
            commands::sync::run_sync(config_path, section).await?;
        }
        Commands::Query { text, model } => {
            commands::query::run_query(config_path, &text, model.as_deref()).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Init => commands::config::init_config(config_path)?,
            ConfigCommands::Show => commands::config::show_config(config_path)?,
            ConfigCommands::Path => commands::config::show_path(config_path),
            ConfigCommands::Example => commands::config::show_example(),
        },
    }

    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use shellbridge::commands::{query, serve, status, stop};
use shellbridge::config::Config;
use shellbridge::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shellbridge")]
#[command(about = "Local command server for file manager extensions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extension server
    Serve {
        /// Socket path (overrides the config file)
        #[arg(long)]
        socket: Option<PathBuf>,

        /// Detach from the terminal and log to the configured log file
        #[arg(short, long)]
        detach: bool,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Show whether the server is running
    Status,

    /// Stop a running server
    Stop,

    /// List repos as the server reports them
    ListRepos {
        /// Last snapshot time already seen, in milliseconds since the epoch
        #[arg(long, default_value_t = 0)]
        since: u64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Request a share link for a file or directory
    ShareLink {
        /// Path inside a tracked repo
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let debug = matches!(cli.command, Commands::Serve { debug: true, .. });
    logging::init(debug);

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { socket, detach, .. } => {
            if let Some(socket) = socket {
                config.socket_path = socket;
            }
            serve::execute(config, detach)
        }
        Commands::Status => status::execute(&config),
        Commands::Stop => stop::execute(&config),
        Commands::ListRepos { since, json } => query::list_repos(&config, since, json),
        Commands::ShareLink { path } => query::share_link(&config, &path),
    }
}

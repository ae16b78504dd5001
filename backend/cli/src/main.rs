mod announce_cmd;
mod leaderboard_cmd;
mod profile_cmd;
mod runtime;
mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use staytime_config::{LoadOptions, Purpose, RunProfile};

#[derive(Parser)]
#[command(name = "staytime")]
#[command(about = "Voice-channel staying time tracker and weekly leaderboard")]
#[command(version)]
struct Cli {
    /// Config file (default: $STAYTIME_CONFIG_DIR/config.yaml or ~/.staytime/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run profile: dev or prod
    #[arg(long, global = true)]
    profile: Option<RunProfile>,

    /// Directory holding .env files
    #[arg(long, global = true, default_value = ".")]
    env_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord, track the voice channel and announce on schedule
    Serve,
    /// Run the weekly announcement once: rank, announce, reset
    Announce {
        /// Print the messages instead of sending them
        #[arg(long)]
        dry_run: bool,
        /// Leave the weekly counters untouched
        #[arg(long)]
        no_reset: bool,
    },
    /// Print the current weekly top-N
    Leaderboard {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print one stored profile as JSON
    Profile {
        user_id: String,
    },
}

impl Commands {
    fn purpose(&self) -> Purpose {
        match self {
            Commands::Serve => Purpose::Serve,
            Commands::Announce { dry_run: false, .. } => Purpose::Announce,
            Commands::Announce { dry_run: true, .. }
            | Commands::Leaderboard { .. }
            | Commands::Profile { .. } => Purpose::Offline,
        }
    }

    /// Long-running and state-changing commands also log to files.
    fn logs_to_file(&self) -> bool {
        matches!(self, Commands::Serve | Commands::Announce { .. })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let opts = LoadOptions {
        path: cli.config.clone(),
        profile: cli.profile,
        env_dir: cli.env_dir.clone(),
        purpose: cli.command.purpose(),
    };
    let loaded = staytime_config::load_and_prepare(&opts).await?;
    let config = &loaded.config;

    let log_dir = cli.command.logs_to_file().then(|| config.log_dir().to_string());
    let _log_guard = staytime_logging::init_logger(log_dir, config.log_level());
    loaded.log();
    info!(profile = %config.effective_profile(), collection = %config.collection(), "Configuration loaded");

    match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Announce { dry_run, no_reset } => announce_cmd::run(config, dry_run, no_reset).await,
        Commands::Leaderboard { json } => leaderboard_cmd::run(config, json).await,
        Commands::Profile { user_id } => profile_cmd::run(config, &user_id).await,
    }
}

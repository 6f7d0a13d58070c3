use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use plaza::commands;
use plaza::config::{Config, LogFormat};
use plaza::model::ContentType;

#[derive(Parser)]
#[command(name = "plaza")]
#[command(version, about = "Engagement counters, follow graph and ephemeral stories")]
struct Cli {
    /// Path to configuration file (default: $PLAZA_HOME/plaza.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (overrides [logging].format)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reclaim expired stories once and print the report
    Sweep,
    /// Run the sweeper on its cron schedule until Ctrl-C
    Scheduler,
    /// Recompute likes and follow counters from their source records
    Reconcile {
        /// Only reconcile this content type (post, video, reel, story, user_asset)
        #[arg(long)]
        content_type: Option<ContentType>,
        /// Skip follow-counter reconciliation
        #[arg(long)]
        skip_profiles: bool,
    },
    /// Validate the configuration and print warnings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Commands::CheckConfig = cli.command {
        return commands::check_config::execute(&config);
    }

    let format = cli.log_format.unwrap_or(config.logging.format);
    plaza::logging::init(format, &config.logging.level)?;

    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    match cli.command {
        Commands::Sweep => commands::sweep::execute(&config).await,
        Commands::Scheduler => commands::scheduler::execute(&config).await,
        Commands::Reconcile {
            content_type,
            skip_profiles,
        } => commands::reconcile::execute(&config, content_type, skip_profiles).await,
        Commands::CheckConfig => commands::check_config::execute(&config),
    }
}

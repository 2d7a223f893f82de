mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "catsync",
    version,
    about = "Synchronize catalog resources between commerce-platform projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synchronization from source to target
    Run {
        /// Path to project YAML file
        config: PathBuf,
        /// Preview mode: compute changes without applying them
        #[arg(long)]
        dry_run: bool,
        /// Sync only this resource type (default: all configured types)
        #[arg(long)]
        resource_type: Option<String>,
    },
    /// Show the stored checkpoint per resource type
    Status {
        /// Path to project YAML file
        config: PathBuf,
    },
    /// Rewind a resource type's checkpoint so the next run is a full sync
    Reset {
        /// Path to project YAML file
        config: PathBuf,
        /// Resource type to reset
        resource_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            resource_type,
        } => commands::run::execute(&config, dry_run, resource_type.as_deref()).await,
        Commands::Status { config } => commands::status::execute(&config).await,
        Commands::Reset {
            config,
            resource_type,
        } => commands::reset::execute(&config, &resource_type).await,
    }
}

mod import;
mod runs;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "synclog-cli")]
#[command(about = "Inspect sync runs reconstructed from the processing log")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// List a user's most recent sync runs
    Runs {
        /// User whose runs to list
        #[arg(long)]
        user: String,
        /// Maximum number of runs (defaults to `SYNCLOG_RUNS_PAGE_SIZE`)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Reconstruct and print one run's source/URL hierarchy
    Show {
        /// User who owns the run
        #[arg(long)]
        user: String,
        /// Id of the run's completion event
        run_id: String,
        /// Only show URLs attributed to this source
        #[arg(long)]
        source: Option<String>,
        /// Print JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
    /// Append newline-delimited processing events from a file
    Import {
        /// Path to a `.jsonl` file, one event per line
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("synclog-cli: no command given; see --help");
        return Ok(());
    };

    let config = synclog_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = synclog_db::PoolConfig::from_app_config(&config);
    let pool = synclog_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            synclog_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = synclog_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Runs { user, limit } => {
            let limit = limit.unwrap_or(config.runs_page_size);
            runs::run_list(pool, &user, limit).await?;
        }
        Commands::Show {
            user,
            run_id,
            source,
            json,
        } => {
            runs::run_show(pool, &user, &run_id, source.as_deref(), json).await?;
        }
        Commands::Import { file } => {
            import::run_import(&pool, &file).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;

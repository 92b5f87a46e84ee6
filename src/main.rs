use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use propquest::config::Config;
use propquest::progression::ProgressionManager;

mod cli;

#[derive(Parser)]
#[command(name = "propquest")]
#[command(about = "Gamified progression engine for a real-estate platform")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.propquest/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the local JSON API server for presentation clients
    Serve,

    /// Show a user's progression profile
    Profile {
        user: String,
    },

    /// Append an XP grant (negative amounts are penalties)
    Grant {
        user: String,
        /// Action type (e.g. property_saved, inquiry_answered)
        action: String,
        amount: i64,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Claim the daily check-in bonus
    Claim {
        user: String,
        /// Calendar day YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record a day of qualifying activity
    Activity {
        user: String,
        /// Calendar day YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        date: Option<String>,
    },

    /// List earned badges
    Badges {
        user: String,
        /// Run the unlock rules before listing
        #[arg(long)]
        evaluate: bool,
    },

    /// Show a leaderboard category
    Leaderboard {
        /// top_xp, top_agents, top_streaks, or top_badges
        category: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Also show this user's rank
        #[arg(long)]
        user: Option<String>,
    },

    /// Show a user's recent XP transactions
    Transactions {
        user: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Initialize ~/.propquest/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Delete progression data
    Reset {
        /// Only delete this user's data
        #[arg(long)]
        user: Option<String>,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    let engine = || -> Result<ProgressionManager> {
        Ok(ProgressionManager::with_path(&config.db_path())?
            .with_daily_policy(config.settings.daily.to_policy()))
    };

    match cli.command {
        Commands::Serve => {
            cli::serve::serve_command(&config, engine()?)?;
        }
        Commands::Profile { user } => {
            cli::user::profile_command(&engine()?, &user)?;
        }
        Commands::Grant {
            user,
            action,
            amount,
            description,
        } => {
            cli::user::grant_command(&engine()?, &user, &action, amount, &description)?;
        }
        Commands::Claim { user, date } => {
            cli::user::claim_command(&engine()?, &user, date.as_deref())?;
        }
        Commands::Activity { user, date } => {
            cli::user::activity_command(&engine()?, &user, date.as_deref())?;
        }
        Commands::Badges { user, evaluate } => {
            cli::user::badges_command(&engine()?, &user, evaluate)?;
        }
        Commands::Leaderboard {
            category,
            limit,
            user,
        } => {
            cli::leaderboard::leaderboard_command(&engine()?, &category, limit, user.as_deref())?;
        }
        Commands::Transactions { user, limit } => {
            cli::user::transactions_command(&engine()?, &user, limit)?;
        }
        Commands::Init { force } => {
            cli::init::init_command(force)?;
        }
        Commands::Reset { user, yes } => {
            cli::reset::reset_command(&engine()?, user.as_deref(), yes)?;
        }
    }

    Ok(())
}

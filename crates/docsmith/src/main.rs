//! docsmith - documentation dashboard in the terminal

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsmith_core::{
    CoreConfig, CoreError, PersistenceHealth, SessionManager, SqliteSnapshotStore, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docsmith",
    version,
    about = "Documentation dashboard: projects, usage and plans",
    long_about = "Manage generated documentation projects, usage quotas and the subscription plan\n\
                  for a user, stored under the docsmith data directory.\n\
                  \n\
                  Examples:\n\
                    docsmith                              # Dashboard (default)\n\
                    docsmith projects --search api        # Filter projects by name\n\
                    docsmith generate src/lib.rs          # Generate documentation for a file\n\
                    docsmith upgrade pro                  # Switch plan\n\
                  \n\
                  Environment Variables:\n\
                    DOCSMITH_DATA_DIR                     # Override data directory\n\
                    DOCSMITH_USER                         # User whose data to open\n\
                    RUST_LOG                              # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Data directory (default: platform data dir / docsmith)
    #[arg(long, env = "DOCSMITH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// User whose data to open
    #[arg(long, env = "DOCSMITH_USER", default_value = "local")]
    user: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show headline numbers and quota usage (default)
    Dashboard,
    /// List projects, newest first
    Projects {
        /// Case-insensitive name filter
        #[arg(long, short = 's')]
        search: Option<String>,
        /// Exact language tag
        #[arg(long, short = 'l')]
        language: Option<String>,
    },
    /// Show one project, including its documentation
    Show {
        id: String,
    },
    /// Generate documentation for a source file
    Generate {
        file: PathBuf,
        /// Project name (default: file stem)
        #[arg(long, short = 'n')]
        name: Option<String>,
        /// Language tag (default: guessed from extension)
        #[arg(long, short = 'l')]
        language: Option<String>,
    },
    /// Change a project's name or status
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// completed | processing | failed
        #[arg(long)]
        status: Option<String>,
    },
    /// Delete a project
    Delete {
        id: String,
    },
    /// Switch subscription plan (free | pro | enterprise)
    Upgrade {
        plan: String,
    },
    /// Record usage by hand
    Meter {
        #[arg(long)]
        api_calls: Option<u64>,
        /// Storage in GB
        #[arg(long)]
        storage: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| dirs::data_dir().map(|d| d.join("docsmith")))
        .context("Could not determine data directory")?;

    let config = CoreConfig::load(&data_dir);
    let db_path = data_dir.join(&config.database_file);
    let store = SqliteSnapshotStore::open(&db_path)
        .with_context(|| format!("Failed to open snapshot store at {}", db_path.display()))?;

    tracing::debug!(path = %db_path.display(), "Snapshot store opened");

    let sessions = SessionManager::new(Arc::new(store), config);
    let (state, report) = sessions.login(UserId::from(cli.user));

    for error in &report.errors {
        eprintln!("warning: {}: {}", error.source, error.message);
        if let Some(suggestion) = &error.suggestion {
            eprintln!("  hint: {}", suggestion);
        }
    }

    let json = cli.json;
    let result = match cli.command.unwrap_or(Command::Dashboard) {
        Command::Dashboard => cli::run_dashboard(&state, json),
        Command::Projects { search, language } => {
            cli::run_projects(&state, search, language, json)
        }
        Command::Show { id } => cli::run_show(&state, &id, json),
        Command::Generate {
            file,
            name,
            language,
        } => cli::run_generate(&sessions, file, name, language, json).await,
        Command::Update { id, name, status } => cli::run_update(&state, &id, name, status),
        Command::Delete { id } => cli::run_delete(&state, &id),
        Command::Upgrade { plan } => cli::run_upgrade(&state, &plan),
        Command::Meter { api_calls, storage } => cli::run_meter(&state, api_calls, storage),
    };

    if let PersistenceHealth::Unsaved { domains, reason } = state.health() {
        eprintln!("warning: unsaved changes in {}: {}", domains.join(", "), reason);
    }

    drop(state);
    sessions.logout();

    // Input mistakes get a one-line message instead of an error chain
    if let Err(e) = &result {
        if let Some(core) = e.downcast_ref::<CoreError>() {
            if core.is_user_facing() {
                eprintln!("error: {}", core);
                std::process::exit(2);
            }
        }
    }
    result
}

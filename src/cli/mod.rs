use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::BrowserController;
use crate::config::{AppConfig, ConfigLoader, PreferenceBackend, CONFIG_ENV, DATA_ENV};
use crate::store::{MemoryPreferenceStore, PreferenceStore, SqlitePreferenceStore};

pub mod commands;

use self::commands::{ListArgs, QueryArgs};

#[derive(Parser, Debug)]
#[command(
    name = "docbrowse",
    version,
    about = "Browse record notes and remote document libraries"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over DOCBROWSE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over DOCBROWSE_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// JSON file seeding the record, notes, views, locations and documents
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the documents in a scope
    Ls(ListArgs),
    /// List the record's document locations
    Locations,
    /// List the views available for notes
    Views,
    /// Print the FetchXML a listing would send
    Query(QueryArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let fixture = commands::load_fixture(cli.fixture.as_deref())?;

    if let Commands::Query(args) = &cli.command {
        println!("{}", commands::render_scope_query(&fixture, &args.scope)?);
        return Ok(());
    }

    let preferences = open_preferences(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(async move {
        let host = fixture.host();
        let controller = BrowserController::mount(
            host,
            fixture.into_collaborators(preferences),
            config.browser.mount_options(),
        )
        .await;
        match cli.command {
            Commands::Ls(args) => commands::list(&controller, &config, args).await,
            Commands::Locations => {
                print!("{}", commands::format_locations(&controller.state()));
                Ok(())
            }
            Commands::Views => {
                print!("{}", commands::format_views(&controller.state()));
                Ok(())
            }
            Commands::Query(_) => Ok(()),
        }
    })
}

fn open_preferences(config: &AppConfig) -> Result<Arc<dyn PreferenceStore>> {
    let store: Arc<dyn PreferenceStore> = match config.preferences.backend {
        PreferenceBackend::Sqlite => {
            Arc::new(SqlitePreferenceStore::open(&config.preferences.database_path)?)
        }
        PreferenceBackend::Memory => Arc::new(MemoryPreferenceStore::new()),
    };
    Ok(store)
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

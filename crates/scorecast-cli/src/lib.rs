// Terminal front end for scorecast.
//
// Commands:
// - `scorecast games`     list games by date section
// - `scorecast timeline`  reconstructed play-by-play for one game
// - `scorecast flow`      narrative blocks for one game
// - `scorecast watch`     live timeline, re-rendered on every poll
// - `scorecast odds`      fair-odds comparison feed
// - `scorecast pin|unpin|read|settings`  local preferences

pub mod commands;
pub mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use scorecast_core::api::{GameApi, HttpApi, Stores};
use scorecast_core::config::Config;
use scorecast_core::prefs::PrefsStore;

/// scorecast: live scores, play-by-play timelines and odds in the terminal.
#[derive(Debug, Parser)]
#[command(name = "scorecast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Override the API base URL from config/scorecast.toml.
    #[arg(long, env = "SCORECAST_API_URL")]
    pub api_url: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List games by date section.
    Games(commands::games::GamesArgs),
    /// Show the reconstructed play-by-play timeline of a game.
    Timeline(commands::timeline::TimelineArgs),
    /// Show the narrative flow of a game.
    Flow(commands::flow::FlowArgs),
    /// Follow a live game until it ends.
    Watch(commands::watch::WatchArgs),
    /// Compare fair odds across books.
    Odds(commands::odds::OddsArgs),
    /// Pin a game to the top of game lists.
    Pin(commands::prefs::GameArg),
    /// Remove a pinned game.
    Unpin(commands::prefs::GameArg),
    /// Mark a game as read (or unread with --unread).
    Read(commands::prefs::ReadArgs),
    /// Show or change display settings.
    Settings(commands::prefs::SettingsArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs, built once from config.
pub struct App {
    pub config: Config,
    pub api: Arc<dyn GameApi>,
    pub stores: Stores,
    pub prefs: PrefsStore,
    pub format: OutputFormat,
}

impl App {
    pub fn new(mut config: Config, cli: &Cli) -> Result<Self> {
        if let Some(url) = &cli.api_url {
            config.api.base_url = url.clone();
        }

        let http = HttpApi::new(
            config.api.base_url.clone(),
            config.credentials.api_key.clone(),
            config.request_timeout(),
        )
        .context("failed to create HTTP client")?;
        info!("API client ready for {}", http.base_url());
        let api: Arc<dyn GameApi> = Arc::new(http);

        let db_path = config.resolve_db_path();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let db_path = db_path.to_string_lossy().into_owned();
        let prefs = PrefsStore::open(&db_path).context("failed to open preferences")?;
        info!("Preferences opened at {db_path}");

        Ok(Self::with_parts(config, api, prefs, cli.format))
    }

    /// Assemble from already-built parts.
    pub fn with_parts(
        config: Config,
        api: Arc<dyn GameApi>,
        prefs: PrefsStore,
        format: OutputFormat,
    ) -> Self {
        let stores = Stores::new(Arc::clone(&api), config.store_policies());
        Self {
            config,
            api,
            stores,
            prefs,
            format,
        }
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Games(args) => commands::games::execute(args, self).await,
            Commands::Timeline(args) => commands::timeline::execute(args, self).await,
            Commands::Flow(args) => commands::flow::execute(args, self).await,
            Commands::Watch(args) => commands::watch::execute(args, self).await,
            Commands::Odds(args) => commands::odds::execute(args, self).await,
            Commands::Pin(args) => commands::prefs::pin(&args, self),
            Commands::Unpin(args) => commands::prefs::unpin(&args, self),
            Commands::Read(args) => commands::prefs::read(&args, self),
            Commands::Settings(args) => commands::prefs::settings(&args, self),
        }
    }
}

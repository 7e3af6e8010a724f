// src/config.rs
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "podtally", version, about = "Track listened episodes and subscriptions")]
pub struct Cli {
    /// Server the listen/subscription endpoints live on.
    #[arg(long, env = "PODTALLY_BASE_URL", default_value = "http://localhost:3200")]
    pub base_url: Url,

    /// Raw `Cookie` header carrying the authenticated session.
    #[arg(long, env = "PODTALLY_SESSION_COOKIE")]
    pub session_cookie: Option<String>,

    #[arg(long, env = "PODTALLY_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Page snapshot (JSON) as rendered by the server.
    #[arg(long, env = "PODTALLY_PAGE", default_value = "page.json")]
    pub page: PathBuf,

    #[arg(long, env = "PODTALLY_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,

    /// Where the terminal UI writes its log.
    #[arg(long, env = "PODTALLY_LOG_FILE", default_value = "podtally.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive terminal page (default).
    Tui,
    /// Mark an episode listened.
    Listen { episode_id: String },
    /// Mark an episode unlistened.
    Unlisten { episode_id: String },
    /// Subscribe to the page's podcast.
    Subscribe,
    /// Unsubscribe from the page's podcast.
    Unsubscribe,
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Url,
    pub session_cookie: Option<String>,
    pub request_timeout: Duration,
    pub page: PathBuf,
    pub log_level: LevelFilter,
    pub log_file: PathBuf,
    pub command: Command,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Self {
            base_url: cli.base_url,
            session_cookie: cli.session_cookie.filter(|c| !c.trim().is_empty()),
            request_timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            page: cli.page,
            log_level: cli.log_level,
            log_file: cli.log_file,
            command: cli.command.unwrap_or(Command::Tui),
        }
    }
}

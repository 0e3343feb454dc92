use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::collaboration::SyncOptions;

/// Where per-owner tokens come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenConfig {
    Static(String),
    Service(String),
    None,
}

/// Resolved configuration. Built once from the command line and never
/// re-read from the environment afterwards.
pub struct Context {
    pub data_dir: PathBuf,
    pub reset: bool,
    pub log_file: Option<PathBuf>,
    pub api_listen: SocketAddr,
    pub github_api_url: String,
    pub tokens: TokenConfig,
    pub page_size: u32,
    pub max_pages: u32,
    pub http_timeout: Duration,
    pub sync: SyncOptions,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let tokens = match (&cli.token_service_url, &cli.github_token) {
            (Some(url), _) => TokenConfig::Service(url.clone()),
            (None, Some(token)) => TokenConfig::Static(token.clone()),
            (None, None) => TokenConfig::None,
        };

        Self {
            data_dir: PathBuf::from(&cli.data_dir),
            reset: cli.reset,
            log_file: cli.log_file.as_ref().map(PathBuf::from),
            api_listen: cli.api_listen,
            github_api_url: cli.github_api_url.clone(),
            tokens,
            page_size: cli.page_size,
            max_pages: cli.max_pages,
            http_timeout: Duration::from_secs(cli.http_timeout_secs),
            sync: SyncOptions { prune: cli.prune },
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("collaborators.sqlite")
    }
}

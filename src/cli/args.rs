use clap::Parser;
use std::env;

use crate::cli::command::Command;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Mirror GitHub repository collaborators into a local SQLite store",
    long_about = "Keeps, for a set of GitHub repositories, the accounts allowed to collaborate on them in sync with a local SQLite database and serves them over a REST API.",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    #[arg(
        long,
        default_value_t = false,
        help = "Reset all persisted state (delete the SQLite database) before starting"
    )]
    pub reset: bool,

    #[arg(
        long,
        env = "COLLABORATORS_DATA_DIR",
        default_value = ".collaborators/",
        value_name = "DIR",
        help = "Directory to store persistent data"
    )]
    pub data_dir: String,

    #[arg(
        long = "log-file",
        env = "COLLABORATORS_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<String>,

    #[arg(
        long = "api-listen",
        env = "COLLABORATORS_API_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:8084",
        help = "REST API listen address (host:port)"
    )]
    pub api_listen: std::net::SocketAddr,

    #[arg(
        long,
        env = "GITHUB_API_URL",
        default_value = crate::github::DEFAULT_API_URL,
        value_name = "URL",
        help = "GitHub REST API base URL"
    )]
    pub github_api_url: String,

    #[arg(
        long,
        env = "GITHUB_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        help = "Token used for every repository owner"
    )]
    pub github_token: Option<String>,

    #[arg(
        long,
        env = "COLLABORATORS_TOKEN_SERVICE_URL",
        value_name = "URL",
        help = "Token service queried for a per-owner token (GET <URL>/tokens/<owner>); takes precedence over --github-token"
    )]
    pub token_service_url: Option<String>,

    #[arg(
        long,
        default_value_t = 100,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..=100),
        help = "Collaborators requested per page"
    )]
    pub page_size: u32,

    #[arg(
        long,
        default_value_t = 500,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Give up on a repository after N pages"
    )]
    pub max_pages: u32,

    #[arg(
        long,
        default_value_t = 30,
        value_name = "SECS",
        help = "Timeout for a single upstream HTTP request"
    )]
    pub http_timeout_secs: u64,

    #[arg(
        long,
        env = "COLLABORATORS_PRUNE",
        default_value_t = false,
        help = "Remove stored links to collaborators that are gone upstream"
    )]
    pub prune: bool,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    dotenvy::from_filename(&dotenv_path).ok();

    Cli::parse()
}

use crate::{
    cli,
    collaboration::CollaborationService,
    context::{self, TokenConfig},
    github::{GitHubClient, HttpTokenSource, StaticTokenSource, TokenSource},
    rest,
    storage::SqliteStorage,
};
use anyhow::{Context as AnyhowContext, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type Service = CollaborationService<SqliteStorage, GitHubClient>;

/// The main application state, decoupled from CLI parsing.
pub struct App {
    config: context::Context,
    service: Arc<Service>,
    shutdown: CancellationToken,
}

impl App {
    /// Builds the App from CLI arguments: log file, data dir, storage and
    /// the GitHub client.
    pub fn from_cli() -> Result<(App, cli::Cli)> {
        let cli = crate::cli::parse();

        crate::tracing::set_log_file(cli.log_file.as_deref().map(Path::new))
            .context("opening log file")?;

        let ctx = context::Context::from_cli(&cli);
        log_startup_info(&ctx);

        let storage = init_storage(&ctx)?;
        let client = init_client(&ctx)?;
        let service = CollaborationService::new(storage, client, ctx.sync);

        Ok((App::new(ctx, service), cli))
    }

    fn new(config: context::Context, service: Service) -> Self {
        Self {
            config,
            service: Arc::new(service),
            shutdown: CancellationToken::new(),
        }
    }

    /// Serves the REST API until Ctrl-C or until the server stops on its own.
    pub async fn run_daemon(&self) -> Result<()> {
        self.log_runtime_config();

        let mut rest_handle = self.spawn_rest_server();
        self.wait_for_shutdown(&mut rest_handle).await
    }

    fn spawn_rest_server(&self) -> JoinHandle<()> {
        let addr = self.config.api_listen;
        let service = Arc::clone(&self.service);
        let token = self.shutdown.clone();

        tokio::spawn(async move {
            if let Err(e) = rest::serve(addr, service, token).await {
                log::error!("REST server failed: {:#}", e);
            }
        })
    }

    async fn wait_for_shutdown(&self, rest_task: &mut JoinHandle<()>) -> Result<()> {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => log::info!("🧨 Ctrl-C received, shutting down..."),
            _ = &mut *rest_task => log::error!("REST task exited unexpectedly"),
        }

        self.shutdown.cancel();

        // A finished JoinHandle must not be polled again.
        if !rest_task.is_finished() {
            let _ = rest_task.await;
        }

        log::info!("✅ Shutdown complete");
        Ok(())
    }

    fn log_runtime_config(&self) {
        log::info!("🌐 REST API: http://{}", self.config.api_listen);
        log::info!(
            "🧮 Page size: {}, max pages: {}",
            self.config.page_size,
            self.config.max_pages
        );
        log::info!("✂️ Prune stale collaborators: {}", self.config.sync.prune);
        if let Some(path) = self.config.log_file.as_deref() {
            log::info!("📝 Log file: {}", path.to_string_lossy());
        }
    }
}

fn log_startup_info(ctx: &context::Context) {
    log::info!("🚀 Starting collaborators");
    log::info!("🔗 GitHub API URL: {}", ctx.github_api_url);
    match &ctx.tokens {
        TokenConfig::Static(_) => log::info!("🔐 Auth: static token"),
        TokenConfig::Service(url) => log::info!("🔐 Auth: token service at {}", url),
        TokenConfig::None => log::warn!("🔐 Auth: no token configured, synchronization will fail"),
    }
    log::info!("📂 Data dir: {}", ctx.data_dir.to_string_lossy());
}

fn init_storage(ctx: &context::Context) -> Result<SqliteStorage> {
    std::fs::create_dir_all(&ctx.data_dir)
        .with_context(|| format!("creating data dir {}", ctx.data_dir.display()))?;

    let sqlite = SqliteStorage::new(ctx.db_path());
    if ctx.reset {
        sqlite.reset_all().context("resetting storage")?;
    }
    sqlite.init().context("initializing storage")?;

    Ok(sqlite)
}

fn init_tokens(ctx: &context::Context) -> Result<Box<dyn TokenSource>> {
    Ok(match &ctx.tokens {
        TokenConfig::Static(token) => Box::new(StaticTokenSource::new(token.clone())),
        TokenConfig::Service(url) => Box::new(
            HttpTokenSource::new(url, ctx.http_timeout)
                .with_context(|| format!("invalid token service URL {}", url))?,
        ),
        TokenConfig::None => Box::new(StaticTokenSource::new("")),
    })
}

fn init_client(ctx: &context::Context) -> Result<GitHubClient> {
    GitHubClient::new(
        &ctx.github_api_url,
        init_tokens(ctx)?,
        ctx.page_size,
        ctx.max_pages,
        ctx.http_timeout,
    )
    .context("building GitHub client")
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    if let Some(cmd) = &cli.cmd {
        return cmd.run(app.service.as_ref());
    }

    app.run_daemon().await
}

mod app;
mod cli;
mod collaboration;
mod commands;
mod context;
mod github;
mod rest;
mod storage;
mod tracing;
mod types;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing::init();
    app::run().await
}

use std::{net::SocketAddr, sync::Arc, time::SystemTime};

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use crate::{collaboration::CollaborationService, github::CollaboratorSource, storage::Store};

mod handlers;
mod models;

use handlers::{
    add_collaborator, create_repository, disconnect_collaborator, edit_collaborator,
    fetch_collaborators, health, list_collaborators, log_failures, not_found,
};

pub struct AppState<S, F> {
    pub service: Arc<CollaborationService<S, F>>,
    pub started_at: SystemTime,
}

impl<S, F> Clone for AppState<S, F> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            started_at: self.started_at,
        }
    }
}

pub fn router<S, F>(service: Arc<CollaborationService<S, F>>) -> Router
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let state = AppState {
        service,
        started_at: SystemTime::now(),
    };

    Router::new()
        .route("/health", get(health::<S, F>))
        .route("/:owner/:repo", put(create_repository::<S, F>))
        .route(
            "/:owner/:repo/collaborators",
            get(list_collaborators::<S, F>)
                .post(add_collaborator::<S, F>)
                .put(edit_collaborator::<S, F>),
        )
        .route(
            "/:owner/:repo/collaborators/fetch",
            get(fetch_collaborators::<S, F>),
        )
        .route(
            "/:owner/:repo/collaborators/:collaborator",
            axum::routing::delete(disconnect_collaborator::<S, F>),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(log_failures))
        .with_state(state)
}

pub async fn serve<S, F>(
    addr: SocketAddr,
    service: Arc<CollaborationService<S, F>>,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 REST service on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}

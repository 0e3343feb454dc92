use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::{
    collaboration::{self, CollaborationService, ServiceError, SyncReport},
    github::CollaboratorSource,
    storage::Store,
    types::{Collaborator, Repository},
};

use super::{
    models::{ErrorResponse, HealthResponse, RepositoryResponse, SyncResponse},
    AppState,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Internal(String),
}

/// Underlying cause of a failed request, kept out of the response body and
/// picked up by [`log_failures`].
#[derive(Clone)]
struct FailureCause(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Service(ServiceError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            ApiError::Service(ServiceError::UnknownAccount(_))
            | ApiError::Service(ServiceError::UnknownRepository(_)) => {
                (StatusCode::NOT_FOUND, "not found".to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        let mut response = (status, Json(ErrorResponse { message })).into_response();
        response
            .extensions_mut()
            .insert(FailureCause(self.to_string()));
        response
    }
}

pub async fn log_failures(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if let Some(FailureCause(cause)) = response.extensions().get::<FailureCause>() {
        let status = response.status();
        if status.is_server_error() {
            log::error!("{} {} {} {}", method, path, status.as_u16(), cause);
        } else {
            log::warn!("{} {} {} {}", method, path, status.as_u16(), cause);
        }
    }

    response
}

/// Runs a service operation on the blocking pool.
async fn call<S, F, T, Op>(state: &AppState<S, F>, op: Op) -> Result<T, ApiError>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
    T: Send + 'static,
    Op: FnOnce(&CollaborationService<S, F>) -> collaboration::Result<T> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    match tokio::task::spawn_blocking(move || op(&service)).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(err) => Err(ApiError::Internal(format!("service task failed: {}", err))),
    }
}

fn full_name(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

fn payload(body: Result<Json<Collaborator>, JsonRejection>) -> Result<Collaborator, ApiError> {
    body.map(|Json(collaborator)| collaborator).map_err(|err| {
        ApiError::BadRequest(format!("unable to decode request body: {}", err.body_text()))
    })
}

fn repository_response(repository: Repository) -> RepositoryResponse {
    RepositoryResponse {
        full_name: repository.full_name,
        tracked: repository.tracked,
    }
}

pub async fn health<S, F>(State(state): State<AppState<S, F>>) -> impl IntoResponse
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_secs,
        }),
    )
}

pub async fn create_repository<S, F>(
    State(state): State<AppState<S, F>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<RepositoryResponse>, ApiError>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let name = full_name(&owner, &repo);
    let repository = call(&state, move |service| service.create_repository(&name)).await?;
    Ok(Json(repository_response(repository)))
}

pub async fn fetch_collaborators<S, F>(
    State(state): State<AppState<S, F>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<SyncResponse>, ApiError>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let name = full_name(&owner, &repo);
    let SyncReport {
        repository,
        fetched,
        linked,
        pruned,
    } = call(&state, move |service| service.synchronize(&name)).await?;
    Ok(Json(SyncResponse {
        repository,
        fetched,
        linked,
        pruned,
    }))
}

pub async fn list_collaborators<S, F>(
    State(state): State<AppState<S, F>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let name = full_name(&owner, &repo);
    let accounts = call(&state, move |service| service.list_accounts(&name)).await?;
    Ok(Json(accounts))
}

pub async fn add_collaborator<S, F>(
    State(state): State<AppState<S, F>>,
    Path((owner, repo)): Path<(String, String)>,
    body: Result<Json<Collaborator>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let collaborator = payload(body)?;
    let name = full_name(&owner, &repo);
    let account = call(&state, move |service| {
        service.add_account(&name, &collaborator)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn edit_collaborator<S, F>(
    State(state): State<AppState<S, F>>,
    Path((owner, repo)): Path<(String, String)>,
    body: Result<Json<Collaborator>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let collaborator = payload(body)?;
    let name = full_name(&owner, &repo);
    let account = call(&state, move |service| {
        service.edit_account(&name, &collaborator)
    })
    .await?;
    Ok(Json(account))
}

pub async fn disconnect_collaborator<S, F>(
    State(state): State<AppState<S, F>>,
    Path((owner, repo, login)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError>
where
    S: Store + Send + Sync + 'static,
    F: CollaboratorSource + 'static,
{
    let name = full_name(&owner, &repo);
    call(&state, move |service| {
        service.disconnect_account(&name, &login)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "not found".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, Router};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::collaboration::test_support::{temp_storage, FixtureSource};
    use crate::collaboration::SyncOptions;
    use crate::github::FetchError;
    use crate::rest::router;
    use crate::storage::SqliteStorage;
    use crate::types::Permissions;

    fn app(source: FixtureSource) -> (TempDir, Router) {
        let (dir, storage) = temp_storage();
        let service: CollaborationService<SqliteStorage, FixtureSource> =
            CollaborationService::new(storage, source, SyncOptions::default());
        (dir, router(Arc::new(service)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn octocat() -> Value {
        json!({"uid": 583231, "login": "octocat", "permissions": {"pull": true, "push": true}})
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_dir, app) = app(FixtureSource::new());
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn add_then_list_collaborators() {
        let (_dir, app) = app(FixtureSource::new());

        let (status, body) = send(&app, "POST", "/octo/widgets/collaborators", Some(octocat())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["login"], "octocat");

        let (status, body) = send(&app, "GET", "/octo/widgets/collaborators", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([octocat()]));
    }

    #[tokio::test]
    async fn list_unknown_repository_is_empty() {
        let (_dir, app) = app(FixtureSource::new());
        let (status, body) = send(&app, "GET", "/octo/none/collaborators", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (_dir, app) = app(FixtureSource::new());
        let (status, body) = send(
            &app,
            "POST",
            "/octo/widgets/collaborators",
            Some(json!({"uid": "not-a-number"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("unable to decode request body"));
    }

    #[tokio::test]
    async fn empty_login_is_bad_request() {
        let (_dir, app) = app(FixtureSource::new());
        let (status, _) = send(
            &app,
            "POST",
            "/octo/widgets/collaborators",
            Some(json!({"uid": 1, "login": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn edit_updates_permissions() {
        let (_dir, app) = app(FixtureSource::new());
        send(&app, "POST", "/octo/widgets/collaborators", Some(octocat())).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/octo/widgets/collaborators",
            Some(json!({"uid": 583231, "login": "octocat", "permissions": {"admin": true}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["permissions"], json!({"admin": true}));
    }

    #[tokio::test]
    async fn edit_unknown_account_is_not_found() {
        let (_dir, app) = app(FixtureSource::new());
        let (status, body) = send(&app, "PUT", "/octo/widgets/collaborators", Some(octocat())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "not found");
    }

    #[tokio::test]
    async fn disconnect_returns_no_content_twice() {
        let (_dir, app) = app(FixtureSource::new());
        send(&app, "POST", "/octo/widgets/collaborators", Some(octocat())).await;

        let (status, _) = send(&app, "DELETE", "/octo/widgets/collaborators/octocat", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", "/octo/widgets/collaborators/octocat", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, "GET", "/octo/widgets/collaborators", None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn fetch_synchronizes_repository() {
        let source = FixtureSource::new().with(
            "octo/widgets",
            vec![
                Collaborator::new(1, "alice", Permissions::from([("pull", true)])),
                Collaborator::new(2, "bob", Permissions::new()),
            ],
        );
        let (_dir, app) = app(source);

        let (status, body) = send(&app, "GET", "/octo/widgets/collaborators/fetch", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"repository": "octo/widgets", "fetched": 2, "linked": 2, "pruned": 0})
        );

        let (_, body) = send(&app, "GET", "/octo/widgets/collaborators", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn upstream_failures_are_server_errors_without_detail() {
        let source = FixtureSource::new().failing(
            "octo/widgets",
            FetchError::RateLimited { reset_at: None },
        );
        let (_dir, app) = app(source);

        let (status, body) = send(&app, "GET", "/octo/widgets/collaborators/fetch", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal server error");

        let (status, _) = send(&app, "GET", "/octo/missing/collaborators/fetch", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn create_repository_is_idempotent() {
        let (_dir, app) = app(FixtureSource::new());

        for _ in 0..2 {
            let (status, body) = send(&app, "PUT", "/octo/widgets", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"full_name": "octo/widgets", "tracked": true}));
        }
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (_dir, app) = app(FixtureSource::new());
        let (status, _) = send(&app, "GET", "/a/b/c/d/e", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// HTTP management API server module

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Router,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod management;

pub use error::{ApiError, ApiJson, ApiQuery};

use crate::config::ConfigStore;

static SERVER_HANDLE: OnceCell<RwLock<Option<oneshot::Sender<()>>>> = OnceCell::new();

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
}

fn management_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get("x-management-key").and_then(|v| v.to_str().ok()) {
        return Some(key.trim());
    }

    // Support both "Bearer <key>" and raw key
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|auth| auth.strip_prefix("Bearer ").unwrap_or(auth).trim())
}

/// Management key middleware
async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.store.snapshot().management_key;

    // If no key is configured, allow all requests
    if expected.is_empty() {
        return next.run(request).await;
    }

    let authorized = matches!(management_key(request.headers()), Some(key) if key == expected);
    if authorized {
        next.run(request).await
    } else {
        tracing::warn!("Rejected management request to {}", request.uri().path());
        ApiError::unauthorized().into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    // Routes that require the management key
    let protected_routes = Router::new()
        .route("/management/status", get(management::get_status))
        .route(
            "/management/config",
            get(management::get_config).put(management::put_config),
        )
        .route(
            "/management/model-mappings",
            get(management::list_mappings).post(management::add_mapping),
        )
        .route(
            "/management/model-mappings/:from",
            put(management::update_mapping).delete(management::delete_mapping),
        )
        .route(
            "/management/model-mappings/:from/enabled",
            patch(management::set_mapping_enabled),
        )
        .route(
            "/management/routing",
            get(management::get_routing).put(management::put_routing),
        )
        .route("/management/slots/:slot", put(management::put_slot))
        .route(
            "/management/amp-providers",
            get(management::list_providers).post(management::add_provider),
        )
        .route(
            "/management/amp-providers/:id",
            put(management::update_provider).delete(management::delete_provider),
        )
        .route("/management/resolve", post(management::resolve))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Routes that don't require authentication
    let public_routes = Router::new().route("/", get(management::root));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(store: Arc<ConfigStore>) -> Result<()> {
    let config = store.snapshot();
    let addr = format!("{}:{}", config.host, config.port);

    let app = build_router(AppState { store });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Management API listening on {}", addr);

    let (tx, rx) = oneshot::channel::<()>();

    SERVER_HANDLE
        .get_or_init(|| RwLock::new(None))
        .write()
        .replace(tx);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            rx.await.ok();
        })
        .await?;

    Ok(())
}

pub async fn stop_server() -> Result<()> {
    if let Some(lock) = SERVER_HANDLE.get() {
        if let Some(tx) = lock.write().take() {
            let _ = tx.send(());
            tracing::info!("Management API stopped");
        }
    }
    Ok(())
}

pub fn is_server_running() -> bool {
    SERVER_HANDLE
        .get()
        .map(|lock| lock.read().is_some())
        .unwrap_or(false)
}

//! HTTP surface of the engine.
//!
//! Handlers are thin: decode the request, run one engine call on the
//! blocking pool through [`with_engine`], encode the result.

mod actor;
mod conversations;
mod events;
mod reviews;
mod users;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::Method,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use convene_core::Engine;
use convene_shared::constants::MAX_IMAGES_PER_UPLOAD;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

pub use actor::Actor;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<Engine>>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(engine: Engine, config: ServerConfig) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            rate_limiter: RateLimiter::from_config(&config),
            config: Arc::new(config),
        }
    }
}

/// Run `f` against the engine on tokio's blocking pool.
pub(crate) async fn with_engine<T, F>(state: &AppState, f: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&Engine) -> convene_core::Result<T> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || {
        let engine = engine
            .lock()
            .map_err(|_| ServerError::Internal("engine lock poisoned".into()))?;
        f(&engine).map_err(ServerError::from)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
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

    let body_limit = upload_body_limit(state.config.max_image_size);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        // Users
        .route("/users", post(users::register))
        .route("/users/by-email", get(users::find_by_email))
        .route("/users/:id", get(users::get).patch(users::update_profile))
        .route("/users/:id/password", post(users::change_password))
        .route("/users/:id/confirmed-events", get(conversations::confirmed_events))
        .route("/users/:id/reviews", get(reviews::for_host))
        .route("/users/:id/rating", get(reviews::host_stats))
        // Catalog
        .route("/categories", get(events::list_categories).post(events::create_category))
        .route("/events", get(events::list).post(events::create))
        .route(
            "/events/:id",
            get(events::get).put(events::update).delete(events::deactivate),
        )
        .route("/events/:id/toggle-active", post(events::toggle_active))
        .route("/events/:id/images", get(events::images).post(events::attach_images))
        .route("/events/:id/images/:image_id", get(events::image_data))
        .route("/events/:id/conversations", get(conversations::for_event))
        .route("/events/:id/my-conversation", get(conversations::mine_for_event))
        .route("/events/:id/reviews", get(reviews::for_event))
        .route("/events/:id/rating", get(reviews::event_stats))
        .route("/events/:id/can-review", get(reviews::can_review))
        // Conversations
        .route("/conversations", get(conversations::for_user).post(conversations::submit))
        .route("/conversations/:id", get(conversations::thread))
        .route("/conversations/:id/status", patch(conversations::transition))
        .route("/conversations/:id/messages", post(conversations::append))
        .route("/conversations/:id/read", post(conversations::mark_read))
        // Reviews
        .route("/reviews", post(reviews::create))
        .route("/reviews/:id", patch(reviews::update).delete(reviews::delete))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Largest request body: a full upload of base64 images, which inflates the
/// bytes by 4/3, plus room for the JSON around it.
fn upload_body_limit(max_image_size: usize) -> usize {
    max_image_size
        .saturating_mul(MAX_IMAGES_PER_UPLOAD)
        .saturating_mul(4)
        / 3
        + 64 * 1024
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    capacity_policy: convene_core::CapacityPolicy,
    review_requires_confirmation: bool,
    max_image_size: usize,
    max_images_per_upload: usize,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        capacity_policy: state.config.capacity_policy,
        review_requires_confirmation: state.config.review_requires_confirmation,
        max_image_size: state.config.max_image_size,
        max_images_per_upload: MAX_IMAGES_PER_UPLOAD,
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

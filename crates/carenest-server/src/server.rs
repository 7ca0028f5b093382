use std::net::SocketAddr;

use axum::{Json, Router, middleware, routing::get};
use carenest_api::ApiError;
use carenest_auth::{AccessPolicy, IdentityResolver};
use carenest_core::Timestamp;
use carenest_db_memory::create_store;
use carenest_storage::DynStore;
use serde_json::{Value, json};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    analytics, bootstrap, config::AppConfig, middleware as app_middleware, reminders, search,
    services, state::AppState,
};

pub struct CarenestServer {
    addr: SocketAddr,
    app: Router,
    store: DynStore,
}

/// Opens the store, provisions the bootstrap admin and assembles shared state.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    carenest_api::set_expose_internal_errors(cfg.server.environment.is_development());

    let store = create_store(&cfg.storage).await?;

    if let Some(admin) = &cfg.bootstrap.admin_user {
        bootstrap::ensure_admin(store.as_ref(), admin).await?;
    }

    let identity = IdentityResolver::new(&cfg.auth, store.clone());
    let policy = AccessPolicy::new(cfg.policy.clone());
    Ok(AppState::new(store, policy, identity))
}

/// Every `/api` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", services::accounts::router())
        .nest("/users", services::users::router())
        .nest("/patients", services::patients::router())
        .nest("/appointments", services::appointments::router())
        .nest("/health-records", services::health_records::router())
        .nest("/preventive-care", services::preventive_care::router())
        .nest("/analytics", analytics::router())
        .nest("/reminders", reminders::router())
        .nest("/search", search::router())
}

pub fn build_router(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .nest("/api", api_routes())
        .fallback(not_found)
        .with_state(state)
        // Middleware stack (order: request id -> compression/cors/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = build_state(cfg).await?;
    Ok(build_router(state, cfg))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Healthcare Wellness API is running",
        "timestamp": Timestamp::now(),
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<CarenestServer> {
        let state = build_state(&self.config).await?;
        let store = state.store.clone();
        let app = build_router(state, &self.config);

        Ok(CarenestServer {
            addr: self.addr,
            app,
            store,
        })
    }
}

impl CarenestServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        self.store.close().await?;
        tracing::info!("entity store closed");
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

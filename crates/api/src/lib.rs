//! Elevator Movement Log API Server
//!
//! REST API for registering elevators, logging their floor-to-floor movements and
//! exporting aggregated demand data.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;

pub use crate::config::{DatabaseConfig, LoggingConfig, MetricsConfig, ServerConfig, ServiceConfig};
pub use crate::error::{ApiError, ServerError};
pub use crate::rate_limit::RateLimitConfig;

use storage::{Repository, StoreCounts};

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus handle, when the exporter is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub counts: Option<StoreCounts>,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub error: Option<String>,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    use routes::{elevators, movements, training};

    let elevator_routes = get(elevators::list_elevators).post(elevators::create_elevator);
    let movement_routes = get(movements::list_movements).post(movements::log_movement);

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/elevators", elevator_routes.clone())
        .route("/elevators/", elevator_routes)
        .route("/movements", movement_routes.clone())
        .route("/movements/", movement_routes)
        .route(
            "/movements/:elevator_id",
            get(movements::list_movements_for_elevator),
        )
        .route("/resting_elevators", get(movements::list_resting_elevators))
        .route("/resting_elevators/", get(movements::list_resting_elevators))
        .route("/ml_data", get(training::get_ml_data))
        .route("/ml_data/", get(training::get_ml_data))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the router and wrap it in the rate limiter when enabled
pub fn build_app(state: Arc<AppState>, limits: &RateLimitConfig) -> Result<Router, ServerError> {
    let router = create_router(state);
    if !limits.enabled {
        return Ok(router);
    }

    let governor_config = rate_limit::create_governor_config(limits)?;
    rate_limit::spawn_limiter_cleanup(&governor_config);
    info!(
        "Rate limiting enabled: burst {}, one request replenished every {}s",
        limits.burst_size, limits.per_second
    );

    Ok(router.layer(GovernorLayer {
        config: governor_config,
    }))
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (database, counts) = match state.repository.counts().await {
        Ok(counts) => (
            ComponentHealth {
                status: "ok".to_string(),
                error: None,
            },
            Some(counts),
        ),
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            (
                ComponentHealth {
                    status: "unavailable".to_string(),
                    error: Some(e.to_string()),
                },
                None,
            )
        }
    };

    let (code, status) = if counts.is_some() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus { database },
        counts,
    };

    (code, Json(response))
}

/// Prometheus exposition handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or_else(|| ApiError::NotFound("metrics exporter is disabled".to_string()))
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ServerError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| ServerError::Logging(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| ServerError::Logging(e.to_string()))
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))
}

/// Run the server
pub async fn run_server(config: ServiceConfig) -> Result<(), ServerError> {
    let repository =
        Repository::connect(&config.database.url, config.database.max_connections).await?;

    let mut state = AppState::new(repository);
    if config.metrics.enabled {
        state = state.with_metrics(init_metrics()?);
    }

    let app = build_app(Arc::new(state), &config.rate_limit)?;

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

use anyhow::{Context, Result};
use std::{future::Future, time::Duration};

use tracing::{info, warn};

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{
    auth_routes::make_auth_routes, content_routes::make_content_routes, log_requests,
    metrics::metrics_handler, search_routes::make_search_routes, state::ServerState,
};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn make_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn make_app(state: ServerState) -> Router {
    let home_router: Router = match state.config.frontend_dir_path.clone() {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/api/auth", make_auth_routes(state.clone()))
        .nest("/api/contenido", make_content_routes(state.clone()))
        .nest("/api/buscar", make_search_routes(state.clone()));

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(make_cors_layer(&state.config.cors_allowed_origins));

    app
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API and the metrics endpoint until `shutdown` resolves.
pub async fn run_server<F>(state: ServerState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    let metrics_server = tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            warn!("Metrics server stopped: {}", err);
        }
    });

    info!("Listening on port {} (metrics on {})", port, metrics_port);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    metrics_server.abort();
    info!("Server stopped");

    Ok(result?)
}

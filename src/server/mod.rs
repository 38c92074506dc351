mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};

use crate::extract::EntityExplorer;
use crate::location::LocationPipeline;
pub use state::AppState;

pub fn build_router(pipeline: LocationPipeline, explorer: Option<EntityExplorer>) -> Router {
    let state = Arc::new(AppState { pipeline, explorer });

    Router::new()
        .route("/map", get(handlers::map_page))
        .route("/api/locations", get(handlers::locations))
        .route("/api/map", get(handlers::map_geojson))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/extract/{kind}", post(handlers::extract))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, pipeline: LocationPipeline, explorer: Option<EntityExplorer>) {
    let app = build_router(pipeline, explorer);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(target: "server", %addr, error = %e, "cannot bind");
            eprintln!("Error: Cannot bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    info!(target: "server", "Event Atlas server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        });
}

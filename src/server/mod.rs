//! HTTP lookup service over a built gazetteer index.

mod handlers;
mod state;

use axum::Router;
use axum::routing::get;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::gazetteer::MatchResolver;

pub fn build_router(resolver: MatchResolver) -> Router {
    let state = Arc::new(AppState { resolver });

    Router::new()
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/candidates", get(handlers::candidates))
        .route("/api/stats", get(handlers::stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, resolver: MatchResolver) -> std::io::Result<()> {
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("birthplace lookup server listening on http://{}", addr);
    axum::serve(listener, app).await
}

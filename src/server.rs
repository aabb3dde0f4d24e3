//! ==============================================================================
//! server.rs - http surface
//! ==============================================================================
//!
//! one route: `GET /` runs the request pipeline and returns its html.
//! the pipeline never fails, so neither does the handler.
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::orchestrator::RequestOrchestrator;

pub fn router(orchestrator: Arc<RequestOrchestrator>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(orchestrator)
}

async fn index_handler(State(orchestrator): State<Arc<RequestOrchestrator>>) -> impl IntoResponse {
    let page = orchestrator.handle().await;
    ([(header::CONTENT_TYPE, page.content_type)], page.body)
}

pub async fn serve(config: &ServerConfig, orchestrator: Arc<RequestOrchestrator>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("[SERVER] Starting web server on {}", addr);
    axum::serve(listener, router(orchestrator)).await?;
    Ok(())
}

//! HTTP surface over a shared [`Advisor`].

mod error;
mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use mizan_engine::Advisor;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

pub fn router(advisor: Arc<Advisor>) -> Router {
    Router::new()
        .route("/api/regulation-drafting", post(routes::regulation_drafting))
        .route("/api/regulation-update", post(routes::regulation_update))
        .route("/api/qa-transform", post(routes::qa_transform))
        .route("/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(advisor)
}

/// Serve until `shutdown` resolves, then shut the advisor down.
pub async fn serve<F>(advisor: Arc<Advisor>, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "mizan server listening");

    axum::serve(listener, router(advisor.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;

    advisor.shutdown();
    Ok(())
}

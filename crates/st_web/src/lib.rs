use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod discussion;
pub mod handlers;
pub mod logging;
pub mod state;

pub use discussion::UtterancesWidget;
pub use state::AppState;

pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/:uid", get(handlers::get_post))
        .route("/api/paths", get(handlers::get_paths))
        .route("/api/listings", post(handlers::create_listing))
        .route("/api/listings/:id", get(handlers::get_listing).delete(handlers::delete_listing))
        .route("/api/listings/:id/next", post(handlers::load_next))
        .route("/api/preview", get(handlers::enter_preview))
        .route("/api/exit-preview", get(handlers::exit_preview))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Precomputes article paths, then serves until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> st_core::Result<()> {
    match state.precompute_paths().await {
        Ok(count) => info!("🗺️ Precomputed {} article paths", count),
        Err(e) => tracing::warn!("⚠️ Could not precompute paths, every article will resolve on demand: {}", e),
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Listening on http://{}", addr);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState, UtterancesWidget};
    pub use st_core::{Error, Result};
}

use std::path::Path;

use axum::Router;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

/// Serve one file for every request path.
pub fn static_router(file: impl AsRef<Path>) -> Router {
    Router::new()
        .fallback_service(ServeFile::new(file))
        .layer(TraceLayer::new_for_http())
}

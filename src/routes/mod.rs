use axum::{Router, http::Uri, routing::get};
use tower_http::services::ServeDir;

use crate::{error::AppError, state::AppState, storage::LOCAL_PUBLIC_PREFIX};

pub mod doc;
pub mod extract;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/orders", orders::router())
}

/// Full application router. `uploads_dir` is served under `/uploads` when
/// images are stored on local disk.
pub fn create_app(state: AppState, uploads_dir: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found);

    if let Some(dir) = uploads_dir {
        router = router.nest_service(LOCAL_PUBLIC_PREFIX, ServeDir::new(dir));
    }

    router.with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

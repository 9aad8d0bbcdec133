use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::manager::{PageSource, SearchManager};

pub mod handlers;
pub mod models;

pub fn create_router<S>(manager: Arc<SearchManager<S>>) -> Router
where
    S: PageSource + Send + Sync + 'static,
{
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/search", post(handlers::search_handler::<S>))
        .route("/api/health", get(handlers::health_handler))
        .with_state(manager)
        .layer(cors)
}

use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ScrapeError;
use crate::manager::{PageSource, SearchManager};

use super::models::{ErrorResponse, SearchResponse};

pub async fn search_handler<S>(
    State(manager): State<Arc<SearchManager<S>>>,
    body: String,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: PageSource + Send + Sync + 'static,
{
    let start = Instant::now();

    let results = manager.run(&body).await.map_err(|e| {
        tracing::error!("search request failed: {e}");
        (
            status_for(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    Ok(Json(SearchResponse {
        total_results: results.len(),
        results,
        processing_time_ms: start.elapsed().as_millis(),
    }))
}

pub async fn health_handler() -> &'static str {
    "ok"
}

pub fn status_for(error: &ScrapeError) -> StatusCode {
    match error {
        ScrapeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScrapeError::HttpStatus { .. } | ScrapeError::InvalidHtml(_) => StatusCode::BAD_GATEWAY,
        ScrapeError::Network { .. } => StatusCode::GATEWAY_TIMEOUT,
        ScrapeError::Proxy { .. } | ScrapeError::InvalidUrl { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

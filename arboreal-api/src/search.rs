use arboreal_core::search::SearchCriteria;
use axum::{routing::post, Json, Router};
use serde::Serialize;

use crate::error::{AppError, AVAILABILITY_ENTRY};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub availability_url: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/search", post(submit_search))
}

/// POST /v1/search
/// Validate the search form and hand off to the availability lookup
async fn submit_search(Json(criteria): Json<SearchCriteria>) -> Result<Json<SearchResponse>, AppError> {
    criteria.validate()?;

    let availability_url = format!("{}?{}", AVAILABILITY_ENTRY, criteria.availability_query());
    tracing::info!(
        rooms = criteria.rooms,
        adults = criteria.adults,
        children = criteria.children,
        "Search handed off to availability"
    );

    Ok(Json(SearchResponse { availability_url }))
}

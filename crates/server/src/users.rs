//! User search.

use api_types::user::{SearchResponse, UserSummary};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{ServerError, auth::CurrentUser, server::ServerState};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// Substring search over names and emails. The caller is always excluded
/// and results are capped at 10.
pub async fn search(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ServerError> {
    let query = params.q.unwrap_or_default();

    let engine = state.engine.read().await;
    let data = engine
        .search_users(user.id, &query)
        .into_iter()
        .map(|hit| UserSummary {
            id: hit.id,
            email: hit.email.clone(),
            display_name: hit.display_name.clone(),
        })
        .collect();

    Ok(Json(SearchResponse {
        success: true,
        data,
    }))
}

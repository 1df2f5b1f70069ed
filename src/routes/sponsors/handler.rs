use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::model::Sponsor;
use crate::{
    AppState,
    cache::{keys::sponsors_key, ttl},
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

const SPONSORS_TABLE: &str = "sponsors";

#[axum::debug_handler]
pub async fn list_sponsors(State(state): State<AppState>) -> impl IntoResponse {
    let result = state
        .cache
        .get_or_fetch(&sponsors_key(), ttl::LONG, || async {
            let query = vec![
                ("select", "*".to_string()),
                ("active", "eq.true".to_string()),
                ("order", "tier.asc".to_string()),
            ];
            state.supabase.select::<Sponsor>(SPONSORS_TABLE, &query).await
        })
        .await;

    match result {
        Ok(sponsors) => (StatusCode::OK, success_to_api_response(sponsors)),
        Err(err) => {
            tracing::error!("failed to load sponsors: {}", err);
            (
                StatusCode::OK,
                error_to_api_response(
                    error_codes::UPSTREAM_ERROR,
                    "Failed to load sponsors".to_string(),
                ),
            )
        }
    }
}

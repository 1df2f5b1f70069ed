use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::model::{CreateListingRequest, GarageSaleListing, ListListingsQuery};
use crate::{
    AppState,
    cache::{
        keys::{LISTINGS_KEY_PREFIX, listings_key},
        ttl,
    },
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

const LISTINGS_TABLE: &str = "garage_sale_listings";

#[axum::debug_handler]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(params): Query<ListListingsQuery>,
) -> impl IntoResponse {
    let key = listings_key(params.community.as_deref(), params.category.as_deref());

    let result = state
        .cache
        .get_or_fetch(&key, ttl::MEDIUM, || async {
            let mut query = vec![
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ];
            if let Some(community) = &params.community {
                query.push(("community", format!("eq.{}", community)));
            }
            if let Some(category) = &params.category {
                query.push(("category", format!("eq.{}", category)));
            }
            state
                .supabase
                .select::<GarageSaleListing>(LISTINGS_TABLE, &query)
                .await
        })
        .await;

    match result {
        Ok(listings) => (StatusCode::OK, success_to_api_response(listings)),
        Err(err) => {
            tracing::error!("failed to load listings: {}", err);
            (
                StatusCode::OK,
                error_to_api_response(
                    error_codes::UPSTREAM_ERROR,
                    "Failed to load listings".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn create_listing(
    State(state): State<AppState>,
    Json(req): Json<CreateListingRequest>,
) -> impl IntoResponse {
    if let Err(reason) = req.validate() {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, reason.to_string()),
        );
    }

    match state
        .supabase
        .insert::<_, GarageSaleListing>(LISTINGS_TABLE, &req.into_row())
        .await
    {
        Ok(mut rows) if !rows.is_empty() => {
            // Every cached filter combination may now be stale.
            state.cache.remove_prefix(LISTINGS_KEY_PREFIX);
            (StatusCode::OK, success_to_api_response(rows.remove(0)))
        }
        Ok(_) => (
            StatusCode::OK,
            error_to_api_response(
                error_codes::INTERNAL_ERROR,
                "Backend returned no listing row".to_string(),
            ),
        ),
        Err(err) => {
            tracing::error!("failed to create listing: {}", err);
            (
                StatusCode::OK,
                error_to_api_response(
                    error_codes::UPSTREAM_ERROR,
                    "Failed to create listing".to_string(),
                ),
            )
        }
    }
}

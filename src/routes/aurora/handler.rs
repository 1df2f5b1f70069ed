use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::model::{AuroraForecast, parse_forecast};
use crate::{
    AppState,
    cache::{keys::aurora_forecast_key, ttl},
    retry::{FetchError, RetryOptions, fetch_with_retry},
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

#[axum::debug_handler]
pub async fn get_forecast(State(state): State<AppState>) -> impl IntoResponse {
    let result = state
        .cache
        .get_or_fetch(&aurora_forecast_key(), ttl::SHORT, || {
            fetch_forecast(&state)
        })
        .await;

    match result {
        Ok(forecast) => (StatusCode::OK, success_to_api_response(forecast)),
        Err(err) => {
            tracing::error!("failed to fetch aurora forecast: {}", err);
            (
                StatusCode::OK,
                error_to_api_response(
                    error_codes::UPSTREAM_ERROR,
                    "Aurora forecast is temporarily unavailable".to_string(),
                ),
            )
        }
    }
}

async fn fetch_forecast(state: &AppState) -> Result<AuroraForecast, FetchError> {
    let response = fetch_with_retry(
        || state.http.get(&state.config.aurora_forecast_url),
        &RetryOptions::default(),
    )
    .await?;

    let rows: serde_json::Value = response.json().await.map_err(FetchError::decode)?;
    parse_forecast(&rows)
        .ok_or_else(|| FetchError::decode("K-index feed had no observation rows"))
}

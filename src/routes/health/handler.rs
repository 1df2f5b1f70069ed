use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::model::PingResponse;
use crate::utils::success_to_api_response;

pub async fn ping() -> impl IntoResponse {
    (
        StatusCode::OK,
        success_to_api_response(PingResponse {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }),
    )
}

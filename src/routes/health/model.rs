use serde::Serialize;

#[derive(Serialize)]
pub struct PingResponse {
    pub status: String,
    pub timestamp: i64,
}

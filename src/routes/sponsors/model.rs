use serde::{Deserialize, Serialize};

/// Sponsor records change rarely; payment state transitions are driven by
/// the payment provider's webhooks against the managed backend directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sponsor {
    pub id: String,
    pub name: String,
    pub tier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

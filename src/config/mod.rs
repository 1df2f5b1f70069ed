use std::env;
use std::time::Duration;

use crate::limiter::PolicyTable;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub jwt_secret: String,
    pub redis_url: Option<String>,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub aurora_forecast_url: String,
    pub cache_default_ttl_secs: u64,
    pub rate_limits: PolicyTable,
}

const DEFAULT_AURORA_FORECAST_URL: &str =
    "https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json";

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".to_string()),
            jwt_secret: env::var("JWT_SECRET")?,
            redis_url: env::var("REDIS_URL").ok(),
            supabase_url: env::var("SUPABASE_URL")?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")?,
            aurora_forecast_url: env::var("AURORA_FORECAST_URL")
                .unwrap_or_else(|_| DEFAULT_AURORA_FORECAST_URL.to_string()),
            cache_default_ttl_secs: env::var("CACHE_DEFAULT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            rate_limits: PolicyTable::from_env(),
        })
    }

    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_default_ttl_secs)
    }
}

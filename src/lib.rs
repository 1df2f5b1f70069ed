use std::sync::Arc;

use cache::TtlCache;
use config::Config;
use supabase::SupabaseClient;

pub mod cache;
pub mod config;
pub mod limiter;
pub mod middleware;
pub mod retry;
pub mod routes;
pub mod supabase;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cache: Arc<TtlCache>,
    pub http: reqwest::Client,
    pub supabase: SupabaseClient,
}

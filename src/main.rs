use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ykbuddy_backend::{
    AppState,
    cache::{TtlCache, spawn_cleanup},
    config::Config,
    limiter::{RateLimitStore, RateLimiter, RedisStore, spawn_sweeper},
    middleware::{RateLimitContext, log_errors, rate_limit},
    routes,
    supabase::SupabaseClient,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");

    let supabase = SupabaseClient::new(
        http.clone(),
        &config.supabase_url,
        &config.supabase_anon_key,
    );

    let cache = Arc::new(TtlCache::new(config.cache_default_ttl()));

    // The in-memory store is per-instance; pointing REDIS_URL at a shared
    // server gives every instance one window space.
    let limiter = match &config.redis_url {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url.clone()).expect("Failed to create Redis client");
            tracing::info!("Rate limiting against shared Redis store");
            Arc::new(RateLimiter::new(RateLimitStore::Redis(RedisStore::new(client))))
        }
        None => Arc::new(RateLimiter::in_memory()),
    };

    // Background expiry sweeps; aborted when the handles drop at shutdown.
    let _limiter_sweeper = spawn_sweeper(limiter.clone(), Duration::from_secs(60));
    let _cache_cleanup = spawn_cleanup(cache.clone(), Duration::from_secs(600));

    let state = AppState {
        config: config.clone(),
        cache,
        http,
        supabase,
    };

    let rate_limit_ctx = Arc::new(RateLimitContext {
        limiter,
        policies: config.rate_limits,
        jwt_secret: config.jwt_secret.clone(),
    });

    let api_routes = Router::new()
        .route("/ping", get(routes::health::ping))
        .route("/aurora/forecast", get(routes::aurora::get_forecast))
        .route(
            "/listings",
            get(routes::listings::list_listings).post(routes::listings::create_listing),
        )
        .route("/sponsors", get(routes::sponsors::list_sponsors))
        .route("/contact", post(routes::contact::submit_contact));

    let router = Router::new().nest(&config.api_base_uri, api_routes);

    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limit_ctx, rate_limit),
    );

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let app = router.with_state(state);

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ride_pool_backend::{
    AppState,
    config::Config,
    routes,
    services::{ai::GeminiClient, geocode::NominatimClient, routing::OsrmClient},
    store::GroupStore,
};

const USER_AGENT: &str = concat!("ride-pool-backend/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ride_pool_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Shared HTTP client for all upstream services. Nominatim requires a
    // distinctive User-Agent.
    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build HTTP client");

    let routing = OsrmClient::new(http.clone(), &config.routing_base_url);
    let geocoder = NominatimClient::new(http.clone(), &config.geocode_base_url);

    let advisor = GeminiClient::from_config(http, &config);
    match &advisor {
        Some(_) => tracing::info!("AI advisor ready ({})", config.gemini_model),
        None => tracing::info!("AI advisor disabled, using deterministic fallbacks"),
    }

    // Create app state
    let state = AppState {
        config: config.clone(),
        routing,
        geocoder,
        advisor,
        groups: GroupStore::default(),
    };

    // Configure rate limiting: 100 requests per 60 seconds per IP
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(60)
            .burst_size(100)
            .finish()
            .unwrap(),
    );

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(GovernorLayer::new(governor_config));

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

// City Weather API v0.1
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::openweather::{OpenWeatherClient, SharedProvider};
use services::scheduler::{SchedulerSettings, SchedulerState, SharedSchedulerState};
use services::store::{PgStore, SharedStore};

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 1;

/// City Weather API: OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "City Weather API",
        version = "0.1.0",
        description = "Polls OpenWeatherMap for a configured set of cities, stores \
            readings, derives daily temperature summaries and consecutive-reading \
            heat alerts, and serves the accumulated data.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Stored weather readings"),
        (name = "Alerts", description = "Heat alerts"),
        (name = "Summaries", description = "Daily temperature summaries"),
        (name = "Forecast", description = "On-demand provider forecast"),
        (name = "Scheduler", description = "Background polling scheduler status"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::get_weather,
        routes::alerts::get_alerts,
        routes::summaries::get_summaries,
        routes::forecast::get_forecast,
        routes::scheduler::get_scheduler_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::ReadingResponse,
            routes::alerts::AlertResponse,
            routes::summaries::DailySummaryResponse,
            routes::forecast::ForecastPointResponse,
            services::scheduler::SchedulerState,
            services::scheduler::CityPollStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "city_weather_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let provider: SharedProvider = Arc::new(
        OpenWeatherClient::new(
            &config.openweather_api_key,
            &config.openweather_base_url,
            Duration::from_secs(config.provider_timeout_secs),
        )
        .expect("Failed to build HTTP client"),
    );
    let store: SharedStore = Arc::new(PgStore::new(pool));

    let app_state = AppState {
        store: store.clone(),
        provider: provider.clone(),
    };

    // Create shared scheduler state and spawn the background scheduler
    let shutdown = CancellationToken::new();
    let scheduler_state: SharedSchedulerState = Arc::new(RwLock::new(SchedulerState::new()));
    let scheduler = tokio::spawn(services::scheduler::run_scheduler(
        store,
        provider,
        SchedulerSettings {
            cities: config.monitored_cities.clone(),
            interval: Duration::from_secs(config.poll_interval_secs),
        },
        scheduler_state.clone(),
        shutdown.clone(),
    ));

    // CORS: read-only API, any origin, GET only
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let query_routes = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/weather", get(routes::weather::get_weather))
        .route("/api/alerts", get(routes::alerts::get_alerts))
        .route("/api/summaries", get(routes::summaries::get_summaries))
        .route("/api/forecast", get(routes::forecast::get_forecast))
        .with_state(app_state);

    let scheduler_routes = Router::new()
        .route(
            "/api/scheduler/status",
            get(routes::scheduler::get_scheduler_status),
        )
        .with_state(scheduler_state);

    let app = Router::new()
        .merge(query_routes)
        .merge(scheduler_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("Server terminated unexpectedly");

    // The server may also stop without a signal; make sure the scheduler follows.
    shutdown.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!("Scheduler task failed: {}", e);
    }
    tracing::info!("Shutdown complete");
}

/// Resolve on Ctrl-C or SIGTERM and cancel `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}

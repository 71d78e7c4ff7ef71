mod error;
mod handlers;
mod metrics;
mod routes;

use agentcheck_common::config::Config;
use agentcheck_engine::catalog::TestCatalog;
use agentcheck_engine::{
    ExecutionStore, ExecutorSettings, MemoryStore, OpenRouterEngine, RedisStore, TestExecutor,
};
use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub executor: TestExecutor,
    pub catalog: TestCatalog,
    pub config: Config,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ExecutionStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            info!("Execution history stored in Redis");
            Ok(Arc::new(store))
        }
        None => {
            info!("REDIS_URL not set, keeping execution history in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    warn!("Received shutdown signal, finishing in-flight requests...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    init_tracing();

    info!("agentcheck API booting...");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(?config, "Configuration loaded");

    if config.server_api_key().is_none() {
        warn!("No OPENROUTER_API_KEY or OPENAI_API_KEY configured; requests must supply api_key");
    }

    let catalog = TestCatalog::load_or_builtin(Path::new(&config.catalog_path))
        .context("Failed to load test case catalog")?;
    info!(
        categories = catalog.all().len(),
        path = %config.catalog_path,
        "Test case catalog loaded"
    );

    let store = build_store(&config).await?;
    let engine = OpenRouterEngine::new(config.provider_base_url.clone())
        .context("Failed to build provider client")?;

    let settings = ExecutorSettings {
        pass_threshold: config.pass_threshold,
        max_concurrency: config.max_concurrent_tests,
        max_test_cases: config.max_test_cases,
        default_timeout: config.test_timeout_seconds,
    };
    let executor = TestExecutor::new(Arc::new(engine), store, settings);

    metrics::register();

    let addr = config.bind_address();
    let state = Arc::new(AppState {
        executor,
        catalog,
        config,
    });

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to accept test runs");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("agentcheck API shutdown complete");
    Ok(())
}

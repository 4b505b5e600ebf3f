//! Dream Content Engine — Binary Entrypoint
//! Boots the Axum HTTP server, arms the recurring generation jobs, and wires
//! shared state and middleware.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dream_content_engine::api::{self, AppState};
use dream_content_engine::config::{CandidatePools, EngineConfig};
use dream_content_engine::generate::client::{DynGenerator, OpenAiGenerator};
use dream_content_engine::generate::Pipeline;
use dream_content_engine::metrics::Metrics;
use dream_content_engine::notify::webhook::WebhookNotifier;
use dream_content_engine::notify::Notifier;
use dream_content_engine::scheduler::ContentScheduler;
use dream_content_engine::store::{ArticleStore, InMemoryStore};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - ENGINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("ENGINE_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dream_content_engine=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = Arc::new(EngineConfig::load());
    let pools = Arc::new(CandidatePools::load());

    // External collaborators. The in-memory store is the default backing for
    // local runs; deployments plug a database-backed ArticleStore in here.
    let store: Arc<dyn ArticleStore> = Arc::new(InMemoryStore::new());
    let generator: DynGenerator = Arc::new(OpenAiGenerator::new(config.model.clone()));
    let notifier: Option<Arc<dyn Notifier>> = std::env::var("SOCIAL_WEBHOOK_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(|url| Arc::new(WebhookNotifier::new(url)) as Arc<dyn Notifier>);

    dream_content_engine::run_generator_probe(generator.as_ref()).await;

    let pipeline = Arc::new(Pipeline::new(
        generator,
        store.clone(),
        pools,
        config.clone(),
        notifier,
    ));

    let scheduler = Arc::new(ContentScheduler::new(pipeline.clone(), &config.schedule));
    scheduler.start();

    let metrics = Metrics::init(config.history_window);

    let state = AppState {
        pipeline,
        scheduler,
        store,
        admin_secret: std::env::var("ADMIN_TRIGGER_SECRET").ok(),
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}

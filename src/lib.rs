// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod category;
pub mod config;
pub mod content_index;
pub mod freshness;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod validator;

// Generation pipeline (stages, client, formatting)
pub mod generate;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::category::ContentCategory;
pub use crate::generate::{GenerationRequest, Pipeline, TriggerSource};
pub use crate::notify::{NotificationEvent, Notifier};
pub use crate::store::{ArticleStore, GeneratedArticle, StoredArticle};
pub use crate::validator::ValidationVerdict;

use tracing::{info, warn};

use crate::generate::client::{Prompt, TextGenerator};

/// One-off smoke test of the text generator at boot. Never panics or
/// returns an error; it just logs whether the service answered.
pub async fn run_generator_probe(generator: &dyn TextGenerator) {
    let prompt = Prompt::new(
        "Reply with the single word: ready.",
        "Connectivity check for the content engine.",
    )
    .with_max_tokens(8);
    match generator.complete(&prompt).await {
        Ok(reply) => info!(
            provider = generator.name(),
            reply = reply.trim(),
            "generator probe ok"
        ),
        Err(e) => warn!(
            provider = generator.name(),
            error = %e,
            "generator probe failed; scheduled runs will fail until the service is reachable"
        ),
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::category::ContentCategory;
use crate::generate::{Pipeline, TriggerSource};
use crate::scheduler::ContentScheduler;
use crate::store::ArticleStore;

const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub scheduler: Arc<ContentScheduler>,
    pub store: Arc<dyn ArticleStore>,
    /// Pre-shared secret for the manual trigger surface. `None` disables
    /// manual triggers entirely.
    pub admin_secret: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/admin/generate/{category}", post(admin_generate))
        .route("/admin/schedule/status", get(schedule_status))
        .route("/debug/recent", get(debug_recent))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn authorized(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let Some(expected) = state.admin_secret.as_deref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "manual triggers are disabled: no admin secret configured".to_string(),
        ));
    };
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err((StatusCode::UNAUTHORIZED, "bad admin secret".to_string()));
    }
    Ok(())
}

/// Manual trigger: runs the same pipeline as the scheduler, but never
/// touches alternation state and gets no slug disambiguator.
async fn admin_generate(
    State(state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(deny) = authorized(&state, &headers) {
        return deny.into_response();
    }
    let category: ContentCategory = match category.parse() {
        Ok(c) => c,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.pipeline.run(category, TriggerSource::Manual).await {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(e) => {
            warn!(%category, error = %e, "manual generation failed");
            (StatusCode::BAD_GATEWAY, format!("generation failed: {e:#}")).into_response()
        }
    }
}

/// Read-only scheduler telemetry: running flag plus human-readable
/// recurrence descriptions.
async fn schedule_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.status())
}

/// Snapshot of recent published articles in a category, as the fingerprint
/// sees them.
async fn debug_recent(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let category = match q
        .get("category")
        .map(String::as_str)
        .unwrap_or("narrative")
        .parse::<ContentCategory>()
    {
        Ok(c) => c,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    let limit = q
        .get("limit")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10)
        .min(100);

    match state.store.query_recent(category, limit).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            warn!(%category, error = %e, "recent query failed");
            (StatusCode::BAD_GATEWAY, "store unavailable".to_string()).into_response()
        }
    }
}

// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /admin/schedule/status
// - POST /admin/generate/{category} (secret guard + happy path)
// - GET /debug/recent

use std::sync::Arc;

use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use dream_content_engine::api::{self, AppState};
use dream_content_engine::config::{CandidatePools, EngineConfig};
use dream_content_engine::generate::client::{DynGenerator, ScriptedGenerator};
use dream_content_engine::scheduler::ContentScheduler;
use dream_content_engine::store::InMemoryStore;
use dream_content_engine::Pipeline;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

const TOPIC_ARTICLE_REPLY: &str = r#"{
  "title": "Reality Checks That Work",
  "body": "A short field guide to reliable reality checks.",
  "tags": ["lucid"]
}"#;

fn test_router(replies: Vec<Result<String, String>>, admin_secret: Option<&str>) -> Router {
    let config = Arc::new(EngineConfig::default());
    let store = Arc::new(InMemoryStore::new());
    let generator: DynGenerator = Arc::new(ScriptedGenerator::new(replies));
    let pipeline = Arc::new(Pipeline::new(
        generator,
        store.clone(),
        Arc::new(CandidatePools::builtin()),
        config.clone(),
        None,
    ));
    let scheduler = Arc::new(ContentScheduler::new(pipeline.clone(), &config.schedule));
    let state = AppState {
        pipeline,
        scheduler,
        store,
        admin_secret: admin_secret.map(str::to_string),
    };
    api::create_router(state)
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(vec![], Some("sesame"));

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK", "health body should be 'OK'");
}

#[tokio::test]
async fn api_status_reports_jobs_without_cron_internals() {
    let app = test_router(vec![], Some("sesame"));

    let req = Request::builder()
        .method("GET")
        .uri("/admin/schedule/status")
        .body(Body::empty())
        .expect("build GET status");

    let resp = app.oneshot(req).await.expect("oneshot status");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(v["running"], Json::Bool(false), "scheduler was never started");
    let jobs = v["jobs"].as_array().expect("jobs array");
    assert_eq!(jobs.len(), 2);
    for job in jobs {
        let schedule = job["schedule"].as_str().expect("schedule string");
        assert!(
            schedule.starts_with("daily at "),
            "schedule must be human-readable, got {schedule:?}"
        );
    }
    let rotation = jobs
        .iter()
        .find(|j| j["name"] == "dream-rotation")
        .expect("alternating job present");
    assert_eq!(rotation["next_category"], Json::String("narrative".into()));
}

#[tokio::test]
async fn api_manual_trigger_requires_the_secret() {
    let app = test_router(vec![Ok(TOPIC_ARTICLE_REPLY.to_string())], Some("sesame"));

    let req = Request::builder()
        .method("POST")
        .uri("/admin/generate/science")
        .body(Body::empty())
        .expect("build POST generate");
    let resp = app.clone().oneshot(req).await.expect("oneshot generate");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("POST")
        .uri("/admin/generate/science")
        .header("x-admin-secret", "wrong")
        .body(Body::empty())
        .expect("build POST generate");
    let resp = app.oneshot(req).await.expect("oneshot generate");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_manual_trigger_is_disabled_without_a_configured_secret() {
    let app = test_router(vec![Ok(TOPIC_ARTICLE_REPLY.to_string())], None);

    let req = Request::builder()
        .method("POST")
        .uri("/admin/generate/science")
        .header("x-admin-secret", "anything")
        .body(Body::empty())
        .expect("build POST generate");
    let resp = app.oneshot(req).await.expect("oneshot generate");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn api_manual_trigger_returns_the_stored_article() {
    let app = test_router(vec![Ok(TOPIC_ARTICLE_REPLY.to_string())], Some("sesame"));

    let req = Request::builder()
        .method("POST")
        .uri("/admin/generate/practical-tips")
        .header("x-admin-secret", "sesame")
        .body(Body::empty())
        .expect("build POST generate");
    let resp = app.oneshot(req).await.expect("oneshot generate");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(v["title"], Json::String("Reality Checks That Work".into()));
    assert_eq!(v["slug"], Json::String("reality-checks-that-work".into()));
    assert_eq!(v["category"], Json::String("practical-tips".into()));
    assert!(v.get("id").is_some() && v.get("published_at").is_some());
}

#[tokio::test]
async fn api_manual_trigger_rejects_unknown_categories() {
    let app = test_router(vec![], Some("sesame"));

    let req = Request::builder()
        .method("POST")
        .uri("/admin/generate/finance")
        .header("x-admin-secret", "sesame")
        .body(Body::empty())
        .expect("build POST generate");
    let resp = app.oneshot(req).await.expect("oneshot generate");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_generation_failure_maps_to_bad_gateway() {
    let app = test_router(vec![Err("model offline".to_string())], Some("sesame"));

    let req = Request::builder()
        .method("POST")
        .uri("/admin/generate/science")
        .header("x-admin-secret", "sesame")
        .body(Body::empty())
        .expect("build POST generate");
    let resp = app.oneshot(req).await.expect("oneshot generate");
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn api_debug_recent_returns_an_array() {
    let app = test_router(vec![], Some("sesame"));

    let req = Request::builder()
        .method("GET")
        .uri("/debug/recent?category=science&limit=5")
        .body(Body::empty())
        .expect("build GET recent");
    let resp = app.oneshot(req).await.expect("oneshot recent");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert!(v.is_array());
}

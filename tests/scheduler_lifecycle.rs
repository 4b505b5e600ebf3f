// tests/scheduler_lifecycle.rs
//
// Scheduler state machine: stopped -> running -> stopped, with read-only
// status snapshots along the way.

use std::sync::Arc;

use dream_content_engine::config::{CandidatePools, EngineConfig};
use dream_content_engine::generate::client::{DynGenerator, ScriptedGenerator};
use dream_content_engine::scheduler::ContentScheduler;
use dream_content_engine::store::InMemoryStore;
use dream_content_engine::Pipeline;

fn scheduler() -> ContentScheduler {
    let config = Arc::new(EngineConfig::default());
    let generator: DynGenerator = Arc::new(ScriptedGenerator::new(Vec::<Result<String, String>>::new()));
    let pipeline = Arc::new(Pipeline::new(
        generator,
        Arc::new(InMemoryStore::new()),
        Arc::new(CandidatePools::builtin()),
        config.clone(),
        None,
    ));
    ContentScheduler::new(pipeline, &config.schedule)
}

#[tokio::test]
async fn starts_stopped_then_runs_then_stops() {
    let s = scheduler();
    assert!(!s.status().running);

    s.start();
    assert!(s.status().running);

    // Status reads are pure telemetry; hammering them changes nothing.
    for _ in 0..10 {
        let status = s.status();
        assert!(status.running);
        assert_eq!(status.jobs.len(), 2);
    }

    s.stop();
    assert!(!s.status().running);
}

#[tokio::test]
async fn start_is_idempotent_while_running() {
    let s = scheduler();
    s.start();
    s.start();
    let status = s.status();
    assert!(status.running);
    assert_eq!(status.jobs.len(), 2, "double start must not duplicate jobs");
    s.stop();
}

#[tokio::test]
async fn job_descriptions_are_stable_across_restart() {
    let s = scheduler();
    let before: Vec<String> = s.status().jobs.into_iter().map(|j| j.schedule).collect();
    s.start();
    s.stop();
    s.start();
    let after: Vec<String> = s.status().jobs.into_iter().map(|j| j.schedule).collect();
    assert_eq!(before, after);
    s.stop();
}

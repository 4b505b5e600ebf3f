//! Recurring trigger scheduler.
//!
//! Two named jobs fire at fixed wall-clock times: one always produces the
//! same category, the other alternates between two. Alternation advances
//! unconditionally at fire time — a failed run must not break the strict
//! A,B,A,B sequence. Each firing runs the pipeline in its own task, so a
//! stalled external call delays only that run, never the next firing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::category::ContentCategory;
use crate::config::ScheduleConfig;
use crate::generate::{Pipeline, TriggerSource};

/// Which category the next alternating firing produces. In-memory only;
/// a restart resets to the first category, which is acceptable — it can
/// skew the long-run split slightly, never corrupt anything.
#[derive(Debug)]
pub struct AlternationState {
    next: AtomicUsize,
}

impl AlternationState {
    pub fn new() -> Self {
        Self {
            next: AtomicUsize::new(0),
        }
    }

    /// Category for the current firing; flips the state for the next one.
    pub fn advance(&self, pair: (ContentCategory, ContentCategory)) -> ContentCategory {
        let i = self.next.fetch_xor(1, Ordering::Relaxed);
        if i == 0 {
            pair.0
        } else {
            pair.1
        }
    }

    /// Category the next firing will produce, without advancing.
    pub fn peek(&self, pair: (ContentCategory, ContentCategory)) -> ContentCategory {
        if self.next.load(Ordering::Relaxed) == 0 {
            pair.0
        } else {
            pair.1
        }
    }
}

impl Default for AlternationState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum JobKind {
    Fixed(ContentCategory),
    Alternating(ContentCategory, ContentCategory),
}

#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: &'static str,
    pub hour: u32,
    pub minute: u32,
    pub utc_offset_minutes: i32,
    pub kind: JobKind,
}

impl JobSpec {
    /// Human-readable recurrence description; internal time math stays
    /// internal.
    pub fn describe(&self) -> String {
        let tz = if self.utc_offset_minutes == 0 {
            "UTC".to_string()
        } else {
            let sign = if self.utc_offset_minutes < 0 { '-' } else { '+' };
            let abs = self.utc_offset_minutes.unsigned_abs();
            format!("UTC{sign}{:02}:{:02}", abs / 60, abs % 60)
        };
        format!("daily at {:02}:{:02} {tz}", self.hour, self.minute)
    }
}

/// Time until the next wall-clock occurrence of `hour:minute` in the given
/// fixed UTC offset.
pub(crate) fn next_fire_delay(
    now_utc: DateTime<Utc>,
    hour: u32,
    minute: u32,
    utc_offset_minutes: i32,
) -> std::time::Duration {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset"));
    let local_now = now_utc.with_timezone(&offset);
    let naive_target = local_now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| local_now.date_naive().and_hms_opt(0, 0, 0).expect("midnight"));
    let mut target = match naive_target.and_local_timezone(offset) {
        chrono::LocalResult::Single(t) => t,
        // Fixed offsets never produce ambiguous or missing local times.
        _ => local_now,
    };
    if target <= local_now {
        target += ChronoDuration::days(1);
    }
    (target.with_timezone(&Utc) - now_utc)
        .to_std()
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub schedule: String,
    /// Category the job's next firing produces.
    pub next_category: ContentCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: Vec<JobStatus>,
}

#[derive(Default)]
struct SchedulerInner {
    running: bool,
    handles: Vec<JoinHandle<()>>,
}

pub struct ContentScheduler {
    pipeline: Arc<Pipeline>,
    jobs: Vec<JobSpec>,
    alternation: Arc<AlternationState>,
    inner: Mutex<SchedulerInner>,
}

impl ContentScheduler {
    /// The two production jobs: a fixed practical-tips slot in the morning
    /// and an afternoon slot alternating dream narratives with science.
    pub fn new(pipeline: Arc<Pipeline>, schedule: &ScheduleConfig) -> Self {
        let jobs = vec![
            JobSpec {
                name: "daily-tips",
                hour: schedule.fixed_hour,
                minute: schedule.fixed_minute,
                utc_offset_minutes: schedule.utc_offset_minutes,
                kind: JobKind::Fixed(ContentCategory::PracticalTips),
            },
            JobSpec {
                name: "dream-rotation",
                hour: schedule.alternating_hour,
                minute: schedule.alternating_minute,
                utc_offset_minutes: schedule.utc_offset_minutes,
                kind: JobKind::Alternating(ContentCategory::Narrative, ContentCategory::Science),
            },
        ];
        Self {
            pipeline,
            jobs,
            alternation: Arc::new(AlternationState::new()),
            inner: Mutex::new(SchedulerInner::default()),
        }
    }

    /// Register and arm all jobs. Idempotent: calling on a running
    /// scheduler does nothing.
    pub fn start(&self) {
        let mut inner = self.inner.lock().expect("scheduler mutex poisoned");
        if inner.running {
            return;
        }
        for job in &self.jobs {
            let spec = job.clone();
            let pipeline = self.pipeline.clone();
            let alternation = self.alternation.clone();
            info!(job = spec.name, schedule = %spec.describe(), "scheduling job");
            inner.handles.push(tokio::spawn(async move {
                loop {
                    let delay =
                        next_fire_delay(Utc::now(), spec.hour, spec.minute, spec.utc_offset_minutes);
                    tokio::time::sleep(delay).await;

                    let category = match spec.kind {
                        JobKind::Fixed(c) => c,
                        JobKind::Alternating(a, b) => alternation.advance((a, b)),
                    };
                    info!(job = spec.name, %category, "scheduled trigger fired");

                    // One firing, one task: a stalled run can't delay the
                    // next tick, and its error can't unwind this loop.
                    let pipeline = pipeline.clone();
                    let job_name = spec.name;
                    tokio::spawn(async move {
                        if let Err(e) = pipeline.run(category, TriggerSource::Scheduled).await {
                            warn!(job = job_name, %category, error = %e, "scheduled run failed");
                        }
                    });
                }
            }));
        }
        inner.running = true;
    }

    /// Deregister all jobs.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().expect("scheduler mutex poisoned");
        for handle in inner.handles.drain(..) {
            handle.abort();
        }
        inner.running = false;
        info!("scheduler stopped");
    }

    /// Read-only telemetry; never mutates scheduling state.
    pub fn status(&self) -> SchedulerStatus {
        let running = self
            .inner
            .lock()
            .expect("scheduler mutex poisoned")
            .running;
        let jobs = self
            .jobs
            .iter()
            .map(|j| JobStatus {
                name: j.name.to_string(),
                schedule: j.describe(),
                next_category: match j.kind {
                    JobKind::Fixed(c) => c,
                    JobKind::Alternating(a, b) => self.alternation.peek((a, b)),
                },
            })
            .collect();
        SchedulerStatus { running, jobs }
    }
}

impl Drop for ContentScheduler {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            for handle in inner.handles.drain(..) {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn alternation_is_strict_regardless_of_run_outcomes() {
        let state = AlternationState::new();
        let pair = (ContentCategory::Narrative, ContentCategory::Science);
        let seq: Vec<_> = (0..6).map(|_| state.advance(pair)).collect();
        assert_eq!(
            seq,
            vec![
                ContentCategory::Narrative,
                ContentCategory::Science,
                ContentCategory::Narrative,
                ContentCategory::Science,
                ContentCategory::Narrative,
                ContentCategory::Science,
            ]
        );
    }

    #[test]
    fn peek_does_not_advance() {
        let state = AlternationState::new();
        let pair = (ContentCategory::Narrative, ContentCategory::Science);
        assert_eq!(state.peek(pair), ContentCategory::Narrative);
        assert_eq!(state.peek(pair), ContentCategory::Narrative);
        state.advance(pair);
        assert_eq!(state.peek(pair), ContentCategory::Science);
    }

    #[test]
    fn next_fire_delay_same_day() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let d = next_fire_delay(now, 9, 30, 0);
        assert_eq!(d.as_secs(), 90 * 60);
    }

    #[test]
    fn next_fire_delay_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let d = next_fire_delay(now, 9, 0, 0);
        assert_eq!(d.as_secs(), 23 * 3600);
    }

    #[test]
    fn next_fire_delay_honors_offset() {
        // 08:00 UTC is 10:00 at UTC+2; a 09:00 local target is tomorrow.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let d = next_fire_delay(now, 9, 0, 120);
        assert_eq!(d.as_secs(), 23 * 3600);
    }

    #[test]
    fn exact_fire_time_waits_a_full_day() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let d = next_fire_delay(now, 9, 0, 0);
        assert_eq!(d.as_secs(), 24 * 3600);
    }

    #[test]
    fn describe_is_human_readable() {
        let job = JobSpec {
            name: "daily-tips",
            hour: 9,
            minute: 0,
            utc_offset_minutes: 0,
            kind: JobKind::Fixed(ContentCategory::PracticalTips),
        };
        assert_eq!(job.describe(), "daily at 09:00 UTC");

        let job = JobSpec {
            utc_offset_minutes: -330,
            ..job
        };
        assert_eq!(job.describe(), "daily at 09:00 UTC-05:30");
    }
}

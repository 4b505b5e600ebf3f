//! Generation pipeline: request resolution, the stage sequence, persistence,
//! and the advisory post-publish tasks.
//!
//! The pipeline is linear with no retry between stages; a stage failure
//! aborts the whole run and nothing is persisted. The category-fit check and
//! outbound notification run after a successful insert, in their own tasks,
//! and can only ever log.

pub mod analysis;
pub mod client;
pub mod format;
pub mod source;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::category::ContentCategory;
use crate::config::{CandidatePools, EngineConfig};
use crate::content_index::{ContentIndex, HistoricalFingerprint};
use crate::freshness;
use crate::notify::{NotificationEvent, Notifier};
use crate::store::{ArticleStore, GeneratedArticle, StoredArticle};
use crate::validator;
use client::DynGenerator;
use source::NarrativeParams;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("generation_runs_total", "Pipeline runs started.");
        describe_counter!(
            "generation_failures_total",
            "Pipeline runs aborted by a stage or persistence failure."
        );
        describe_counter!("articles_published_total", "Articles persisted.");
        describe_counter!(
            "validator_misfit_total",
            "Published articles flagged by the category-fit check."
        );
        describe_counter!(
            "validator_failopen_total",
            "Category-fit checks that failed open."
        );
        describe_counter!(
            "notify_failures_total",
            "Outbound notifications that failed after retries."
        );
        describe_gauge!(
            "generation_last_publish_ts",
            "Unix ts of the most recent successful publish."
        );
    });
}

/// Where a pipeline run originated. Scheduler-originated runs get a slug
/// disambiguator; manual runs do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Scheduled,
    Manual,
}

/// Resolved parameters for one run. Created fresh per trigger, never reused.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub category: ContentCategory,
    pub trigger: TriggerSource,
    pub params: RequestParams,
}

#[derive(Debug, Clone)]
pub enum RequestParams {
    Narrative(NarrativeParams),
    Topic(String),
}

pub struct Pipeline {
    generator: DynGenerator,
    store: Arc<dyn ArticleStore>,
    index: ContentIndex,
    pools: Arc<CandidatePools>,
    config: Arc<EngineConfig>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Pipeline {
    pub fn new(
        generator: DynGenerator,
        store: Arc<dyn ArticleStore>,
        pools: Arc<CandidatePools>,
        config: Arc<EngineConfig>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        ensure_metrics_described();
        let index = ContentIndex::new(store.clone(), config.history_window);
        Self {
            generator,
            store,
            index,
            pools,
            config,
            notifier,
        }
    }

    /// Run the pipeline end to end for one trigger: fingerprint, select,
    /// generate, persist, then kick off the advisory post-publish tasks.
    pub async fn run(
        &self,
        category: ContentCategory,
        trigger: TriggerSource,
    ) -> Result<StoredArticle> {
        counter!("generation_runs_total").increment(1);

        let fingerprint = self.index.fingerprint(category).await;
        let result = async {
            let request = self.build_request(category, trigger, &fingerprint)?;
            let article = self.execute(&request).await?;
            self.store.insert(article).await.context("persisting article")
        }
        .await;

        let stored = match result {
            Ok(stored) => stored,
            Err(e) => {
                counter!("generation_failures_total").increment(1);
                return Err(e);
            }
        };

        counter!("articles_published_total").increment(1);
        gauge!("generation_last_publish_ts").set(Utc::now().timestamp().max(0) as f64);
        info!(
            slug = %stored.article.slug,
            %category,
            trigger = ?trigger,
            "article published"
        );

        self.spawn_post_publish(&stored);
        Ok(stored)
    }

    /// Resolve generation parameters via freshness selection against the
    /// category's history fingerprint.
    pub fn build_request(
        &self,
        category: ContentCategory,
        trigger: TriggerSource,
        fingerprint: &HistoricalFingerprint,
    ) -> Result<GenerationRequest> {
        let params = if category.is_narrative() {
            let history = fingerprint.narrative_history();
            let bar = self.config.thresholds.narrative_element;
            let setting = freshness::select(&self.pools.settings, &history, bar)
                .context("settings pool is empty")?
                .clone();
            let theme = freshness::select(&self.pools.themes, &history, bar)
                .context("themes pool is empty")?
                .clone();
            let tone = freshness::select(&self.pools.tones, &history, bar)
                .context("tones pool is empty")?
                .clone();
            RequestParams::Narrative(NarrativeParams {
                setting,
                theme,
                tone,
            })
        } else {
            let topics = self.pools.topics(category);
            let topic = freshness::select(
                topics,
                &fingerprint.topic_history(),
                self.config.thresholds.topic,
            )
            .with_context(|| format!("no topics configured for category {category}"))?
            .clone();
            RequestParams::Topic(topic)
        };
        Ok(GenerationRequest {
            category,
            trigger,
            params,
        })
    }

    /// Execute the stage sequence for a resolved request. Returns the
    /// complete article or the first stage's error.
    pub async fn execute(&self, request: &GenerationRequest) -> Result<GeneratedArticle> {
        let generator = self.generator.as_ref();
        let mut article = match &request.params {
            RequestParams::Narrative(params) => {
                let narrative = source::generate_narrative(generator, params).await?;
                let interpretation = analysis::interpret_narrative(generator, &narrative).await?;
                format::format_narrative_article(generator, narrative, interpretation).await?
            }
            RequestParams::Topic(topic) => {
                format::format_topic_article(generator, topic, request.category).await?
            }
        };

        if request.trigger == TriggerSource::Scheduled {
            article.slug = format::disambiguate_slug(&article.slug, Utc::now());
        }
        Ok(article)
    }

    /// Advisory tasks after a successful publish. Their failures are logged
    /// and counted, never surfaced to the caller.
    fn spawn_post_publish(&self, stored: &StoredArticle) {
        let generator = self.generator.clone();
        let min_confidence = self.config.thresholds.validator_confidence;
        let flagged = stored.clone();
        tokio::spawn(async move {
            let verdict = validator::validate(
                generator.as_ref(),
                &flagged.article.body,
                &flagged.article.title,
                flagged.article.category,
                min_confidence,
            )
            .await;
            if !verdict.is_valid {
                counter!("validator_misfit_total").increment(1);
                warn!(
                    slug = %flagged.article.slug,
                    category = %flagged.article.category,
                    confidence = verdict.confidence,
                    suggested = ?verdict.suggested_category,
                    reason = ?verdict.reason,
                    "category fit check flagged a published article"
                );
            }
        });

        if let Some(notifier) = self.notifier.clone() {
            let event = NotificationEvent::for_article(stored);
            tokio::spawn(async move {
                if let Err(e) = notifier.publish(&event).await {
                    counter!("notify_failures_total").increment(1);
                    warn!(error = %e, notifier = notifier.name(), "publish notification failed");
                }
            });
        }
    }
}

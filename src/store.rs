//! Article persistence boundary.
//!
//! The real storage layer lives outside this crate; everything here talks to
//! it through [`ArticleStore`]. Inserts are atomic per article — a partially
//! generated article is never handed to the store in the first place, and the
//! store must never expose a partial write.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::ContentCategory;
use crate::generate::analysis::DreamInterpretation;
use crate::generate::source::DreamNarrative;

/// A finished, publishable article as produced by the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub subtitle: String,
    pub slug: String,
    pub excerpt: String,
    pub body: String,
    pub category: ContentCategory,
    pub tags: Vec<String>,
    pub seo_title: String,
    pub seo_description: String,
    /// Raw generated source material, kept for narrative-derived categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<NarrativeProvenance>,
}

/// The dream narrative and its structured interpretation that an article
/// was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeProvenance {
    pub narrative: DreamNarrative,
    pub interpretation: DreamInterpretation,
}

/// An article after a successful insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: u64,
    pub published_at: DateTime<Utc>,
    #[serde(flatten)]
    pub article: GeneratedArticle,
}

/// Read view over a published article, narrowed to the fields fingerprinting
/// cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub title: String,
    pub tags: Vec<String>,
    pub symbols: Vec<String>,
    pub themes: Vec<String>,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Atomic single-article insert.
    async fn insert(&self, article: GeneratedArticle) -> Result<StoredArticle>;

    /// Most recent `limit` published articles in `category`, newest first.
    async fn query_recent(
        &self,
        category: ContentCategory,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>>;

    fn name(&self) -> &'static str;
}

/// In-memory store. Backs local runs and tests; production deployments plug
/// a database-backed implementation in behind the same trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Vec<StoredArticle>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the last `n` stored articles, oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<StoredArticle> {
        let v = self.inner.lock().expect("store mutex poisoned");
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn insert(&self, article: GeneratedArticle) -> Result<StoredArticle> {
        let mut v = self.inner.lock().expect("store mutex poisoned");
        let stored = StoredArticle {
            id: v.len() as u64 + 1,
            published_at: Utc::now(),
            article,
        };
        v.push(stored.clone());
        Ok(stored)
    }

    async fn query_recent(
        &self,
        category: ContentCategory,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>> {
        let v = self.inner.lock().expect("store mutex poisoned");
        let records = v
            .iter()
            .rev()
            .filter(|s| s.article.category == category)
            .take(limit)
            .map(|s| {
                let (symbols, themes) = match &s.article.provenance {
                    Some(p) => (
                        p.interpretation
                            .symbols
                            .iter()
                            .map(|sym| sym.name.clone())
                            .collect(),
                        p.interpretation.themes.clone(),
                    ),
                    None => (Vec::new(), Vec::new()),
                };
                HistoricalRecord {
                    title: s.article.title.clone(),
                    tags: s.article.tags.clone(),
                    symbols,
                    themes,
                }
            })
            .collect();
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

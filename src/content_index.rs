//! Historical fingerprints over recently published content.
//!
//! Recomputed on every generation request, never persisted. Storage failure
//! degrades to an empty fingerprint: losing the freshness guarantee for one
//! run beats losing the run.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::warn;

use crate::category::ContentCategory;
use crate::store::ArticleStore;

/// Normalized, deduplicated text drawn from the most recent published
/// articles in one category.
#[derive(Debug, Clone, Default)]
pub struct HistoricalFingerprint {
    pub titles: Vec<String>,
    pub tags: Vec<String>,
    /// Symbol and theme terms from narrative provenance.
    pub terms: Vec<String>,
}

impl HistoricalFingerprint {
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.tags.is_empty() && self.terms.is_empty()
    }

    /// History set used when picking narrative elements: titles plus
    /// extracted symbol/theme terms.
    pub fn narrative_history(&self) -> Vec<String> {
        let mut out = self.titles.clone();
        out.extend(self.terms.iter().cloned());
        out
    }

    /// History set used when picking whole-topic strings: titles plus tags.
    pub fn topic_history(&self) -> Vec<String> {
        let mut out = self.titles.clone();
        out.extend(self.tags.iter().cloned());
        out
    }
}

pub struct ContentIndex {
    store: Arc<dyn ArticleStore>,
    window: usize,
}

impl ContentIndex {
    pub fn new(store: Arc<dyn ArticleStore>, window: usize) -> Self {
        Self { store, window }
    }

    /// Fingerprint of the most recent `window` articles in `category`.
    /// Fails soft: a storage error yields an empty fingerprint and a warning.
    pub async fn fingerprint(&self, category: ContentCategory) -> HistoricalFingerprint {
        let records = match self.store.query_recent(category, self.window).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    error = %e,
                    %category,
                    store = self.store.name(),
                    "history query failed, generating without freshness history"
                );
                return HistoricalFingerprint::default();
            }
        };

        let mut fp = HistoricalFingerprint::default();
        let mut seen = HashSet::new();
        for r in &records {
            push_unique(&mut fp.titles, &mut seen, &r.title);
            for t in &r.tags {
                push_unique(&mut fp.tags, &mut seen, t);
            }
            for s in &r.symbols {
                push_unique(&mut fp.terms, &mut seen, s);
            }
            for t in &r.themes {
                push_unique(&mut fp.terms, &mut seen, t);
            }
        }
        fp
    }
}

/// Lowercase, collapse whitespace, and keep only first occurrences
/// (case-insensitive).
fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, raw: &str) {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    let norm = re_ws.replace_all(raw.trim(), " ").to_lowercase();
    if norm.is_empty() {
        return;
    }
    if seen.insert(norm.clone()) {
        out.push(norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GeneratedArticle, HistoricalRecord, StoredArticle};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl ArticleStore for FailingStore {
        async fn insert(&self, _article: GeneratedArticle) -> Result<StoredArticle> {
            Err(anyhow!("down"))
        }
        async fn query_recent(
            &self,
            _category: ContentCategory,
            _limit: usize,
        ) -> Result<Vec<HistoricalRecord>> {
            Err(anyhow!("down"))
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct CannedStore(Vec<HistoricalRecord>);

    #[async_trait]
    impl ArticleStore for CannedStore {
        async fn insert(&self, _article: GeneratedArticle) -> Result<StoredArticle> {
            Err(anyhow!("read-only"))
        }
        async fn query_recent(
            &self,
            _category: ContentCategory,
            _limit: usize,
        ) -> Result<Vec<HistoricalRecord>> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &'static str {
            "canned"
        }
    }

    #[tokio::test]
    async fn storage_failure_yields_empty_fingerprint() {
        let index = ContentIndex::new(Arc::new(FailingStore), 40);
        let fp = index.fingerprint(ContentCategory::Narrative).await;
        assert!(fp.is_empty());
    }

    #[tokio::test]
    async fn fingerprint_lowercases_and_dedups_case_insensitively() {
        let records = vec![
            HistoricalRecord {
                title: "The Hidden Room".into(),
                tags: vec!["Lucid".into(), "lucid".into()],
                symbols: vec!["Water".into()],
                themes: vec!["water".into(), "Flight".into()],
            },
            HistoricalRecord {
                title: "the hidden room".into(),
                tags: vec![],
                symbols: vec![],
                themes: vec![],
            },
        ];
        let index = ContentIndex::new(Arc::new(CannedStore(records)), 40);
        let fp = index.fingerprint(ContentCategory::Narrative).await;
        assert_eq!(fp.titles, vec!["the hidden room"]);
        assert_eq!(fp.tags, vec!["lucid"]);
        assert_eq!(fp.terms, vec!["water", "flight"]);
    }
}

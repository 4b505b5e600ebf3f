//! Outbound notifications for freshly published articles.
//!
//! Fired after persistence succeeds, off the transactional path: a failed
//! notification never touches the stored article.

pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;

use crate::category::ContentCategory;
use crate::store::StoredArticle;

#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub title: String,
    pub excerpt: String,
    pub slug: String,
    pub category: ContentCategory,
    pub published_at_iso: String,
}

impl NotificationEvent {
    pub fn for_article(stored: &StoredArticle) -> Self {
        Self {
            title: stored.article.title.clone(),
            excerpt: stored.article.excerpt.clone(),
            slug: stored.article.slug.clone(),
            category: stored.article.category,
            published_at_iso: stored.published_at.to_rfc3339(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

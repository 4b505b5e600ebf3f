//! Formatting stage: assemble a publishable article, plus the slug rules.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::analysis::DreamInterpretation;
use super::client::{parse_json_reply, Prompt, TextGenerator};
use super::source::DreamNarrative;
use crate::category::ContentCategory;
use crate::store::{GeneratedArticle, NarrativeProvenance};

/// Slugs derived from titles are capped at this length.
pub const SLUG_MAX_LEN: usize = 60;

/// Derive a URL-safe slug from a title. Deterministic: lowercase, strip
/// non-alphanumerics, collapse whitespace runs to single hyphens, trim
/// hyphens, cap at [`SLUG_MAX_LEN`].
pub fn slugify(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            cleaned.push(' ');
        }
        // Everything else is stripped.
    }
    let mut slug = String::with_capacity(cleaned.len());
    for word in cleaned.split_whitespace() {
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(word);
    }
    slug.truncate(SLUG_MAX_LEN);
    slug.trim_end_matches('-').to_string()
}

/// Append a uniqueness disambiguator for unattended runs. The candidate
/// pools are small and reused indefinitely, so scheduler-generated titles
/// will eventually collide on their base slugs.
pub fn disambiguate_slug(slug: &str, at: DateTime<Utc>) -> String {
    format!("{slug}-{}", at.format("%Y%m%d%H%M%S"))
}

/// What the formatting stage is asked to produce. Everything optional on
/// the wire; required holes fail the stage, cosmetic holes get derived.
#[derive(Debug, Default, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    seo_title: String,
    #[serde(default)]
    seo_description: String,
}

fn system_prompt() -> String {
    "You are the editor of a dream-journal publication. Reply with a single \
     JSON object, no prose around it, with keys: title, subtitle, slug, \
     excerpt, body (full markdown article), tags (array of strings), \
     seo_title, seo_description."
        .to_string()
}

fn narrative_user_prompt(
    narrative: &DreamNarrative,
    interpretation: &DreamInterpretation,
) -> String {
    let symbols: Vec<&str> = interpretation
        .symbols
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    format!(
        "Write a long-form article that retells this dream and walks through \
         its interpretation.\n\nDream \"{title}\":\n{body}\n\n\
         Interpretation: {interp}\nKey symbols: {symbols}\nGuidance: {guidance}",
        title = narrative.title,
        body = narrative.body,
        interp = interpretation.interpretation,
        symbols = symbols.join(", "),
        guidance = interpretation.guidance,
    )
}

fn topic_user_prompt(topic: &str, category: ContentCategory) -> String {
    format!(
        "Write a long-form {} article on the topic: {topic}. \
         Informative, grounded, 800-1200 words.",
        category.display_name().to_lowercase()
    )
}

/// Shared tail of the formatting stage: parse, enforce required fields,
/// derive the cosmetic ones.
fn finish(
    reply: &str,
    category: ContentCategory,
    provenance: Option<NarrativeProvenance>,
) -> Result<GeneratedArticle> {
    let raw: RawArticle = parse_json_reply(reply).context("formatting stage: malformed article")?;

    if raw.title.trim().is_empty() || raw.body.trim().is_empty() {
        bail!("formatting stage: article missing title or body");
    }
    let title = raw.title.trim().to_string();

    // A provided slug still goes through slugify so every stored slug obeys
    // the same charset/length rules; an omitted one derives from the title.
    let slug = match slugify(&raw.slug) {
        s if !s.is_empty() => s,
        _ => slugify(&title),
    };
    if slug.is_empty() {
        bail!("formatting stage: cannot derive a slug from title {title:?}");
    }

    let excerpt = if raw.excerpt.trim().is_empty() {
        raw.body.chars().take(200).collect::<String>().trim().to_string()
    } else {
        raw.excerpt.trim().to_string()
    };
    let seo_title = if raw.seo_title.trim().is_empty() {
        title.clone()
    } else {
        raw.seo_title.trim().to_string()
    };
    let seo_description = if raw.seo_description.trim().is_empty() {
        excerpt.clone()
    } else {
        raw.seo_description.trim().to_string()
    };

    Ok(GeneratedArticle {
        title,
        subtitle: raw.subtitle.trim().to_string(),
        slug,
        excerpt,
        body: raw.body,
        category,
        tags: raw.tags,
        seo_title,
        seo_description,
        provenance,
    })
}

/// Formatting stage for narrative-derived articles.
pub async fn format_narrative_article(
    generator: &dyn TextGenerator,
    narrative: DreamNarrative,
    interpretation: DreamInterpretation,
) -> Result<GeneratedArticle> {
    let prompt = Prompt::new(
        system_prompt(),
        narrative_user_prompt(&narrative, &interpretation),
    );
    let reply = generator
        .complete(&prompt)
        .await
        .context("formatting stage: generator call failed")?;
    finish(
        &reply,
        ContentCategory::Narrative,
        Some(NarrativeProvenance {
            narrative,
            interpretation,
        }),
    )
}

/// Formatting stage for educational articles: the freshness-selected topic
/// string is the direct input.
pub async fn format_topic_article(
    generator: &dyn TextGenerator,
    topic: &str,
    category: ContentCategory,
) -> Result<GeneratedArticle> {
    let prompt = Prompt::new(system_prompt(), topic_user_prompt(topic, category));
    let reply = generator
        .complete(&prompt)
        .await
        .context("formatting stage: generator call failed")?;
    finish(&reply, category, None)
}

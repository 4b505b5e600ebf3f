//! Category fit validator.
//!
//! Advisory telemetry, never a publishing gate: a misfit verdict is honored
//! only above a confidence bar, and every failure mode — call error, garbage
//! reply, low confidence — resolves to "fit". False negatives from an
//! unreliable external judgment must never block valid content.

use anyhow::Result;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::category::ContentCategory;
use crate::generate::client::{parse_json_reply, Prompt, TextGenerator};

/// How much of the body is sent for judgment.
const EXCERPT_CHARS: usize = 1500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<ContentCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationVerdict {
    fn fit() -> Self {
        Self {
            is_valid: true,
            confidence: 0.0,
            suggested_category: None,
            reason: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawVerdict {
    #[serde(default = "default_fits")]
    fits: bool,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    suggested_category: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

fn default_fits() -> bool {
    true
}

fn judgment_prompt(excerpt: &str, title: &str, category: ContentCategory) -> Prompt {
    let system = "You audit article categorization for a dream-journal \
                  publication. Reply with a single JSON object, no prose \
                  around it, with keys: fits (boolean), confidence (0.0-1.0), \
                  suggested_category (string or null), reason (string)."
        .to_string();
    let user = format!(
        "Category \"{cat}\". Rules: {rules}\n\nTitle: {title}\n\n\
         Article excerpt:\n{excerpt}\n\nDoes this article fit the category? \
         If not, suggest one of: narrative, science, practical-tips, \
         symbol-reference.",
        cat = category.as_str(),
        rules = category.fit_rules(),
    );
    Prompt::new(system, user).with_temperature(0.0).with_max_tokens(300)
}

/// Judge whether generated content matches its declared category.
///
/// A misfit is reported only when the judgment itself says misfit *and* its
/// confidence exceeds `min_confidence`. Anything else — including a failed
/// or unparsable call — is fit (fail-open).
pub async fn validate(
    generator: &dyn TextGenerator,
    body: &str,
    title: &str,
    category: ContentCategory,
    min_confidence: f32,
) -> ValidationVerdict {
    let excerpt: String = body.chars().take(EXCERPT_CHARS).collect();
    let prompt = judgment_prompt(&excerpt, title, category);

    let raw = match call_and_parse(generator, &prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            counter!("validator_failopen_total").increment(1);
            warn!(error = %e, %category, "category fit check failed open");
            return ValidationVerdict::fit();
        }
    };

    let confidence = raw.confidence.clamp(0.0, 1.0);
    if raw.fits || confidence <= min_confidence {
        return ValidationVerdict {
            is_valid: true,
            confidence,
            suggested_category: None,
            reason: None,
        };
    }

    ValidationVerdict {
        is_valid: false,
        confidence,
        suggested_category: raw
            .suggested_category
            .as_deref()
            .and_then(|s| s.parse().ok()),
        reason: raw.reason,
    }
}

async fn call_and_parse(generator: &dyn TextGenerator, prompt: &Prompt) -> Result<RawVerdict> {
    let reply = generator.complete(prompt).await?;
    parse_json_reply(&reply)
}

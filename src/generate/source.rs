//! Source stage: generate a structured dream narrative from
//! freshness-selected parameters.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::client::{parse_json_reply, Prompt, TextGenerator};

/// Freshness-selected inputs for one narrative generation.
#[derive(Debug, Clone)]
pub struct NarrativeParams {
    pub setting: String,
    pub theme: String,
    pub tone: String,
}

/// A generated dream narrative. Parsed with defaults — the generative
/// source's output is not schema-guaranteed — but an article can't be built
/// from a narrative with no title or body, so those two are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamNarrative {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub lucid: bool,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub tone: String,
}

fn system_prompt() -> String {
    "You write first-person dream accounts for a dream journal. \
     Reply with a single JSON object, no prose around it, with keys: \
     title, body, mood, tags (array of strings), lucid (boolean), \
     setting, characters (array of strings), tone."
        .to_string()
}

fn user_prompt(params: &NarrativeParams) -> String {
    format!(
        "Write a vivid dream set in {setting}. The dream centers on {theme}. \
         Overall tone: {tone}. 400-700 words in the body.",
        setting = params.setting,
        theme = params.theme,
        tone = params.tone,
    )
}

/// Run the source stage. Any generator or parse failure aborts the run.
pub async fn generate_narrative(
    generator: &dyn TextGenerator,
    params: &NarrativeParams,
) -> Result<DreamNarrative> {
    let prompt = Prompt::new(system_prompt(), user_prompt(params));
    let reply = generator
        .complete(&prompt)
        .await
        .context("source stage: generator call failed")?;
    let mut narrative: DreamNarrative =
        parse_json_reply(&reply).context("source stage: malformed narrative")?;

    if narrative.title.trim().is_empty() || narrative.body.trim().is_empty() {
        bail!("source stage: narrative missing title or body");
    }
    // Echo the requested axes back into the record when the model left
    // them out, so provenance stays self-describing.
    if narrative.setting.trim().is_empty() {
        narrative.setting = params.setting.clone();
    }
    if narrative.tone.trim().is_empty() {
        narrative.tone = params.tone.clone();
    }
    Ok(narrative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::client::ScriptedGenerator;

    fn params() -> NarrativeParams {
        NarrativeParams {
            setting: "a flooded street turned into a canal".into(),
            theme: "finding a hidden room".into(),
            tone: "wistful".into(),
        }
    }

    #[tokio::test]
    async fn parses_fenced_narrative_and_backfills_axes() {
        let reply = r#"```json
        {"title": "The Canal", "body": "I drifted past my old school.", "mood": "calm",
         "tags": ["water"], "lucid": false, "characters": []}
        ```"#;
        let g = ScriptedGenerator::of_ok([reply]);
        let n = generate_narrative(&g, &params()).await.unwrap();
        assert_eq!(n.title, "The Canal");
        assert_eq!(n.setting, "a flooded street turned into a canal");
        assert_eq!(n.tone, "wistful");
        assert!(!n.lucid);
    }

    #[tokio::test]
    async fn empty_body_is_a_stage_failure() {
        let g = ScriptedGenerator::of_ok([r#"{"title": "T", "body": ""}"#]);
        assert!(generate_narrative(&g, &params()).await.is_err());
    }

    #[tokio::test]
    async fn non_json_reply_is_a_stage_failure() {
        let g = ScriptedGenerator::of_ok(["Once upon a time..."]);
        assert!(generate_narrative(&g, &params()).await.is_err());
    }
}

//! Analysis stage: turn a dream narrative into a structured interpretation.
//!
//! The generative source's output shape is advisory at best, so parsing is
//! a validation boundary: out-of-range intensities are clamped, unknown
//! significance values land on the middle tier, and missing fields default
//! to safe empty values. Only unparsable JSON fails the stage.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::client::{parse_json_reply, Prompt, TextGenerator};
use super::source::DreamNarrative;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    Low,
    Medium,
    High,
}

impl Significance {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" => Significance::Low,
            "high" | "major" => Significance::High,
            // Unrecognized values land on the middle tier.
            _ => Significance::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    pub meaning: String,
    pub significance: Significance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionEntry {
    pub name: String,
    /// 0–100 after clamping.
    pub intensity: u8,
    /// Display color hint, e.g. "#7c9fd1".
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamInterpretation {
    pub interpretation: String,
    pub symbols: Vec<SymbolEntry>,
    pub emotions: Vec<EmotionEntry>,
    pub themes: Vec<String>,
    pub guidance: String,
}

// Loose wire shapes; everything optional, numbers taken wide.
#[derive(Debug, Default, Deserialize)]
struct RawInterpretation {
    #[serde(default)]
    interpretation: String,
    #[serde(default)]
    symbols: Vec<RawSymbol>,
    #[serde(default)]
    emotions: Vec<RawEmotion>,
    #[serde(default)]
    themes: Vec<String>,
    #[serde(default)]
    guidance: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawSymbol {
    #[serde(default)]
    name: String,
    #[serde(default)]
    meaning: String,
    #[serde(default)]
    significance: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawEmotion {
    #[serde(default)]
    name: String,
    #[serde(default)]
    intensity: i64,
    #[serde(default)]
    color: String,
}

impl DreamInterpretation {
    fn from_raw(raw: RawInterpretation) -> Self {
        let symbols = raw
            .symbols
            .into_iter()
            .filter(|s| !s.name.trim().is_empty())
            .map(|s| SymbolEntry {
                name: s.name.trim().to_string(),
                meaning: s.meaning,
                significance: Significance::parse(&s.significance),
            })
            .collect();
        let emotions = raw
            .emotions
            .into_iter()
            .filter(|e| !e.name.trim().is_empty())
            .map(|e| EmotionEntry {
                name: e.name.trim().to_string(),
                intensity: e.intensity.clamp(0, 100) as u8,
                color: e.color,
            })
            .collect();
        Self {
            interpretation: raw.interpretation,
            symbols,
            emotions,
            themes: raw.themes,
            guidance: raw.guidance,
        }
    }

    /// Parse a generator reply into a validated interpretation.
    pub fn parse(reply: &str) -> Result<Self> {
        let raw: RawInterpretation =
            parse_json_reply(reply).context("analysis stage: malformed interpretation")?;
        Ok(Self::from_raw(raw))
    }
}

fn system_prompt() -> String {
    "You interpret dreams for a dream journal. Reply with a single JSON \
     object, no prose around it, with keys: interpretation (string), \
     symbols (array of {name, meaning, significance: low|medium|high}), \
     emotions (array of {name, intensity: 0-100, color: hex string}), \
     themes (array of strings), guidance (string)."
        .to_string()
}

/// Run the analysis stage over a generated narrative.
pub async fn interpret_narrative(
    generator: &dyn TextGenerator,
    narrative: &DreamNarrative,
) -> Result<DreamInterpretation> {
    let user = format!(
        "Interpret this dream titled \"{}\":\n\n{}",
        narrative.title, narrative.body
    );
    let prompt = Prompt::new(system_prompt(), user).with_temperature(0.6);
    let reply = generator
        .complete(&prompt)
        .await
        .context("analysis stage: generator call failed")?;
    DreamInterpretation::parse(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_intensity_and_defaults_significance() {
        let reply = r##"{
            "interpretation": "Change is coming.",
            "symbols": [
                {"name": "water", "meaning": "emotion", "significance": "cosmic"},
                {"name": "door", "meaning": "choice", "significance": "high"}
            ],
            "emotions": [
                {"name": "awe", "intensity": 250, "color": "#fff"},
                {"name": "dread", "intensity": -3, "color": ""}
            ],
            "themes": ["change"],
            "guidance": "Sleep on it."
        }"##;
        let parsed = DreamInterpretation::parse(reply).unwrap();
        assert_eq!(parsed.symbols[0].significance, Significance::Medium);
        assert_eq!(parsed.symbols[1].significance, Significance::High);
        assert_eq!(parsed.emotions[0].intensity, 100);
        assert_eq!(parsed.emotions[1].intensity, 0);
    }

    #[test]
    fn missing_fields_default_safe() {
        let parsed = DreamInterpretation::parse("{}").unwrap();
        assert!(parsed.interpretation.is_empty());
        assert!(parsed.symbols.is_empty());
        assert!(parsed.emotions.is_empty());
        assert!(parsed.themes.is_empty());
    }

    #[test]
    fn nameless_entries_are_dropped() {
        let reply = r#"{"symbols": [{"meaning": "?"}], "emotions": [{"intensity": 40}]}"#;
        let parsed = DreamInterpretation::parse(reply).unwrap();
        assert!(parsed.symbols.is_empty());
        assert!(parsed.emotions.is_empty());
    }

    #[test]
    fn unparsable_reply_fails() {
        assert!(DreamInterpretation::parse("forty-two").is_err());
    }
}

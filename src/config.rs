//! Engine configuration and candidate pools.
//!
//! Thresholds mirror the values the system was tuned with; they are plain
//! config fields rather than hard constants so operators can adjust them
//! without a rebuild.

use std::path::Path;
use std::{env, fs};

use serde::Deserialize;
use tracing::warn;

use crate::category::ContentCategory;

pub const DEFAULT_CONFIG_PATH: &str = "config/generation.toml";
pub const ENV_CONFIG_PATH: &str = "GENERATION_CONFIG_PATH";

pub const DEFAULT_CANDIDATES_PATH: &str = "config/candidates.toml";
pub const ENV_CANDIDATES_PATH: &str = "CANDIDATES_CONFIG_PATH";

fn default_narrative_element_threshold() -> f32 {
    0.3
}
fn default_topic_threshold() -> f32 {
    0.5
}
fn default_validator_confidence() -> f32 {
    0.7
}
fn default_history_window() -> usize {
    40
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_fixed_hour() -> u32 {
    9
}
fn default_alternating_hour() -> u32 {
    16
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// Max similarity a narrative element (setting/theme/tone) may have
    /// against recent history and still count as fresh.
    #[serde(default = "default_narrative_element_threshold")]
    pub narrative_element: f32,
    /// Topic strings are longer, so partial overlap is expected even for
    /// distinct topics; the bar sits higher.
    #[serde(default = "default_topic_threshold")]
    pub topic: f32,
    /// A misfit verdict from the validator is honored only above this
    /// confidence.
    #[serde(default = "default_validator_confidence")]
    pub validator_confidence: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            narrative_element: default_narrative_element_threshold(),
            topic: default_topic_threshold(),
            validator_confidence: default_validator_confidence(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Wall-clock hour/minute for the fixed-category job.
    #[serde(default = "default_fixed_hour")]
    pub fixed_hour: u32,
    #[serde(default)]
    pub fixed_minute: u32,
    /// Wall-clock hour/minute for the alternating job.
    #[serde(default = "default_alternating_hour")]
    pub alternating_hour: u32,
    #[serde(default)]
    pub alternating_minute: u32,
    /// Offset from UTC in minutes for both wall-clock times.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fixed_hour: default_fixed_hour(),
            fixed_minute: 0,
            alternating_hour: default_alternating_hour(),
            alternating_minute: 0,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    /// How many recent articles per category feed the fingerprint.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Model id passed to the generative text service.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            history_window: default_history_window(),
            schedule: ScheduleConfig::default(),
            model: default_model(),
        }
    }
}

impl EngineConfig {
    /// Load from `GENERATION_CONFIG_PATH` (default `config/generation.toml`).
    /// Missing or unparsable config falls back to defaults with a warning;
    /// the engine must be able to boot without an on-disk config.
    pub fn load() -> Self {
        let path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = match fs::read_to_string(&path) {
            Ok(s) => toml::from_str::<EngineConfig>(&s).unwrap_or_else(|e| {
                warn!(error = %e, %path, "generation config unparsable, using defaults");
                EngineConfig::default()
            }),
            Err(_) => EngineConfig::default(),
        };
        cfg.sanitize();
        cfg
    }

    /// Clamp out-of-range values instead of refusing to start.
    pub fn sanitize(&mut self) {
        self.thresholds.narrative_element = self.thresholds.narrative_element.clamp(0.0, 1.0);
        self.thresholds.topic = self.thresholds.topic.clamp(0.0, 1.0);
        self.thresholds.validator_confidence = self.thresholds.validator_confidence.clamp(0.0, 1.0);
        if self.history_window == 0 {
            self.history_window = default_history_window();
        }
        self.schedule.fixed_hour %= 24;
        self.schedule.fixed_minute %= 60;
        self.schedule.alternating_hour %= 24;
        self.schedule.alternating_minute %= 60;
        // Offsets beyond +-14h are nonsense; treat as UTC.
        if self.schedule.utc_offset_minutes.abs() > 14 * 60 {
            self.schedule.utc_offset_minutes = 0;
        }
    }
}

/// Hand-authored topic/setting/theme pools, one axis per category concern.
/// Static configuration data, not runtime state.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePools {
    pub settings: Vec<String>,
    pub themes: Vec<String>,
    pub tones: Vec<String>,
    pub science_topics: Vec<String>,
    pub practical_topics: Vec<String>,
    pub symbol_topics: Vec<String>,
}

impl CandidatePools {
    /// Load from `CANDIDATES_CONFIG_PATH` if present, else the compiled-in
    /// default pools.
    pub fn load() -> Self {
        let path =
            env::var(ENV_CANDIDATES_PATH).unwrap_or_else(|_| DEFAULT_CANDIDATES_PATH.to_string());
        if Path::new(&path).exists() {
            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|s| toml::from_str::<CandidatePools>(&s).map_err(Into::into))
            {
                Ok(pools) => return pools,
                Err(e) => {
                    warn!(error = %e, %path, "candidate pools unreadable, using built-in pools");
                }
            }
        }
        Self::builtin()
    }

    /// Pools compiled into the binary from `config/candidates.toml`.
    pub fn builtin() -> Self {
        toml::from_str(include_str!("../config/candidates.toml"))
            .expect("built-in candidate pools must parse")
    }

    /// Topic pool for an educational category. Narrative has no single topic
    /// pool; it draws from settings/themes/tones instead.
    pub fn topics(&self, category: ContentCategory) -> &[String] {
        match category {
            ContentCategory::Science => &self.science_topics,
            ContentCategory::PracticalTips => &self.practical_topics,
            ContentCategory::SymbolReference => &self.symbol_topics,
            ContentCategory::Narrative => &[],
        }
    }
}

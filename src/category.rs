//! Content categories for generated articles.
//!
//! Every article belongs to exactly one category at persistence time. The
//! category also drives the generation path: narrative categories run the
//! full dream + interpretation pipeline, educational ones format a single
//! freshness-selected topic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentCategory {
    Narrative,
    Science,
    PracticalTips,
    SymbolReference,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 4] = [
        ContentCategory::Narrative,
        ContentCategory::Science,
        ContentCategory::PracticalTips,
        ContentCategory::SymbolReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Narrative => "narrative",
            ContentCategory::Science => "science",
            ContentCategory::PracticalTips => "practical-tips",
            ContentCategory::SymbolReference => "symbol-reference",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContentCategory::Narrative => "Dream Narrative",
            ContentCategory::Science => "Dream Science",
            ContentCategory::PracticalTips => "Practical Tips",
            ContentCategory::SymbolReference => "Symbol Reference",
        }
    }

    /// Categories that carry structured dream provenance (raw narrative +
    /// interpretation) through the pipeline.
    pub fn is_narrative(&self) -> bool {
        matches!(self, ContentCategory::Narrative)
    }

    /// Inclusion/exclusion rules sent to the category-fit validator.
    pub fn fit_rules(&self) -> &'static str {
        match self {
            ContentCategory::Narrative => {
                "Includes: first-person dream accounts, retold dreams with interpretation. \
                 Excludes: research summaries, how-to advice, glossary entries."
            }
            ContentCategory::Science => {
                "Includes: sleep and dream research, neuroscience, studies, mechanisms. \
                 Excludes: personal dream stories, practical technique walkthroughs."
            }
            ContentCategory::PracticalTips => {
                "Includes: actionable techniques for recall, lucidity, sleep hygiene. \
                 Excludes: research deep-dives, personal dream stories, symbol glossaries."
            }
            ContentCategory::SymbolReference => {
                "Includes: dream symbol meanings, symbol glossary entries and their \
                 interpretations. Excludes: personal narratives, research, how-to guides."
            }
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('_', "-");
        ContentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == norm)
            .ok_or_else(|| anyhow::anyhow!("unknown content category: {s}"))
    }
}

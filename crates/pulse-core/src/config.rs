//! Pipeline configuration
//!
//! Everything the pipeline treats as static for a run: similarity threshold,
//! score weights and cutoffs, and the curated name tables. The defaults below
//! are the production values; the binary layers file and environment
//! overrides on top of them.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::{PulseError, PulseResult};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum token-sort similarity (0-100) for two names to share an entity
    pub similarity_threshold: f64,
    pub scoring: ScoringConfig,
    pub names: NameTables,
    pub ingest: IngestConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 88.0,
            scoring: ScoringConfig::default(),
            names: NameTables::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check the invariants the scorer relies on. Any violation is fatal.
    pub fn validate(&self) -> PulseResult<()> {
        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            return Err(PulseError::InvalidConfig(format!(
                "similarity_threshold must be within [0, 100], got {}",
                self.similarity_threshold
            )));
        }
        self.scoring.validate()
    }
}

// =============================================================================
// Scoring
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub signal: SignalThresholds,
    pub confidence: ConfidenceBands,

    /// Multiplier on mean sentiment before clipping
    pub sentiment_amplification: f64,

    /// Multiplier on (positive_ratio - negative_ratio) before clipping
    pub consistency_amplification: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            signal: SignalThresholds::default(),
            confidence: ConfidenceBands::default(),
            sentiment_amplification: 3.0,
            consistency_amplification: 2.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> PulseResult<()> {
        self.weights.validate()?;

        let SignalThresholds { apply, avoid } = self.signal;
        if !(0.0..=1.0).contains(&avoid) || !(0.0..=1.0).contains(&apply) || avoid >= apply {
            return Err(PulseError::InvalidConfig(format!(
                "signal thresholds need 0 <= avoid < apply <= 1, got avoid={} apply={}",
                avoid, apply
            )));
        }

        let ConfidenceBands { high, medium } = self.confidence;
        if !(0.0..=0.5).contains(&high) || !(0.0..=0.5).contains(&medium) || medium > high {
            return Err(PulseError::InvalidConfig(format!(
                "confidence bands need 0 <= medium <= high <= 0.5, got medium={} high={}",
                medium, high
            )));
        }

        for (name, value) in [
            ("sentiment_amplification", self.sentiment_amplification),
            ("consistency_amplification", self.consistency_amplification),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PulseError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Weights of the four sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub sentiment: f64,
    pub consistency: f64,
    pub buzz: f64,
    pub trend: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            sentiment: 0.45,
            consistency: 0.30,
            buzz: 0.15,
            trend: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.sentiment + self.consistency + self.buzz + self.trend
    }

    pub fn validate(&self) -> PulseResult<()> {
        let all = [self.sentiment, self.consistency, self.buzz, self.trend];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PulseError::InvalidConfig(format!(
                "weights must be finite and non-negative: {:?}",
                self
            )));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PulseError::InvalidConfig(format!(
                "weights must sum to 1.0, got {:.6}",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// `APPLY` at or above `apply`, `AVOID` at or below `avoid`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub apply: f64,
    pub avoid: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            apply: 0.58,
            avoid: 0.42,
        }
    }
}

/// Minimum distance from 0.5 for each confidence tier
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            high: 0.15,
            medium: 0.08,
        }
    }
}

// =============================================================================
// Name tables
// =============================================================================

/// Curated name tables shared read-only by the extractor, canonicalizer and
/// scorer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NameTables {
    /// Raw mention -> canonical name. Case-sensitive, checked before anything else.
    pub overrides: HashMap<String, String>,

    /// Lowercase words that never appear in a company name
    pub stop_words: HashSet<String>,

    pub junk: JunkNames,
}

impl Default for NameTables {
    fn default() -> Self {
        Self {
            overrides: DEFAULT_OVERRIDES
                .iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
            stop_words: to_set(DEFAULT_STOP_WORDS),
            junk: JunkNames::default(),
        }
    }
}

/// Names that are not companies, at two granularities.
///
/// `mention` is checked per raw mention before clustering; `entity` is checked
/// per canonical entity right before scoring. The two lists overlap but are
/// kept apart since each decides a different stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JunkNames {
    pub mention: HashSet<String>,
    pub entity: HashSet<String>,
}

impl Default for JunkNames {
    fn default() -> Self {
        Self {
            mention: to_set(DEFAULT_MENTION_JUNK),
            entity: to_set(DEFAULT_ENTITY_JUNK),
        }
    }
}

impl JunkNames {
    pub fn is_mention_junk(&self, name: &str) -> bool {
        self.mention.contains(&name.trim().to_lowercase())
    }

    pub fn is_entity_junk(&self, name: &str) -> bool {
        self.entity.contains(&name.trim().to_lowercase())
    }
}

// =============================================================================
// Ingestion
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Drop records whose text mentions none of `ipo_keywords`
    pub require_ipo_keyword: bool,
    pub ipo_keywords: Vec<String>,

    /// Drop records whose text repeats an earlier record's verbatim
    pub dedupe_text: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            require_ipo_keyword: true,
            ipo_keywords: DEFAULT_IPO_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            dedupe_text: true,
        }
    }
}

fn to_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

const DEFAULT_IPO_KEYWORDS: &[&str] = &[
    "ipo",
    "public issue",
    "listing",
    "drhp",
    "rhp",
    "sebi",
    "subscription",
    "anchor investor",
    "grey market",
    "gmp",
    "allotment",
    "price band",
];

const DEFAULT_STOP_WORDS: &[&str] = &[
    "upcoming",
    "mainboard",
    "sme",
    "big",
    "new",
    "check",
    "total",
    "record",
    "india",
    "crore",
    "cr",
    "million",
    "billion",
    "only",
    "from",
    "six",
    "nine",
    "four",
    "which",
    "the",
    "about",
    "where",
    "what",
    "why",
    "each",
    "click",
    "latest",
    "average",
    "korean",
    "rebounding",
    "rs",
    "ipo",
    "sebi",
    "bse",
    "nse",
    "drhp",
    "gmp",
    "all",
    "top",
    "best",
    "key",
    "major",
    "five",
    "three",
    "two",
    "ten",
    "how",
    "when",
    "first",
    "last",
    "this",
    "that",
    "more",
    "most",
    "many",
    "some",
    "other",
    "your",
    "our",
    "their",
    "its",
    "has",
    "have",
    "had",
    "was",
    "were",
    "will",
    "would",
    "here",
    "there",
    "into",
    "over",
    "under",
    "after",
    "before",
    "during",
    "amid",
    "versus",
    "vs",
    "per",
    "via",
    "and",
    "for",
    "with",
    "unprecedented",
    "indian",
    "startup",
    "biggest",
    "resorts",
    "spacex",
    "backed",
    "largest",
    "booming",
    "busiest",
];

const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    ("Shadowfax Tech", "Shadowfax Technologies"),
    ("Shadowfax", "Shadowfax Technologies"),
    ("Advit Jewels Limited", "Advit Jewels"),
    ("Meesho Files", "Meesho"),
    ("Hannah Joseph", "Hannah Joseph Hospital"),
    ("PhonePe PhonePe", "PhonePe"),
    ("Backed PhonePe", "PhonePe"),
    ("PhonePe Files Draft", "PhonePe"),
    ("UPL Subsidiary Advanta Enterprises", "Advanta Enterprises"),
    ("E Transportation Infrastructure", "E Transportation"),
    ("Madhur Iron & Steel Files", "Madhur Iron & Steel"),
    ("Fujiyama Power Systems", "Fujiyama Power"),
    ("Kanishk Aluminium India", "Kanishk Aluminium"),
    ("Fractal Analytics & Others", "Fractal Analytics"),
    ("Fractal Industries", "Fractal Analytics"),
    ("CleanMax", "CleanMax Enviro Energy"),
    ("Clean Max Enviro Energy Solutions", "CleanMax Enviro Energy"),
    ("Clean Max Enviro Energy", "CleanMax Enviro Energy"),
    ("Clean Max Enviro", "CleanMax Enviro Energy"),
    ("Clean Max", "CleanMax Enviro Energy"),
    ("CleanMax Enviro", "CleanMax Enviro Energy"),
    ("CleanMax Plans", "CleanMax Enviro Energy"),
    ("Can Clean Max", "CleanMax Enviro Energy"),
    ("Mobilise App Lab Limited", "Mobilise App Lab"),
    ("Mobilise App", "Mobilise App Lab"),
    ("Bonfiglioli Transmissions Limited", "Bonfiglioli Transmissions"),
    ("Pride Hotels Limited", "Pride Hotels"),
    ("Shree Ram", "Shree Ram Twistex"),
];

const DEFAULT_MENTION_JUNK: &[&str] = &[
    "smes to launch",
    "indian stock exchanges following successful",
    "does clean max enviro energy",
    "plans",
    "proposed",
    "christmas",
    "dual",
    "steel",
    "market",
    "revenue cagr post",
    "research centre",
];

const DEFAULT_ENTITY_JUNK: &[&str] = &[
    "plans",
    "proposed",
    "christmas",
    "dual",
    "steel",
    "market",
    "revenue cagr post",
    "research centre",
    "does clean max enviro energy",
    "can clean max",
    "cleanmax plans",
    "mrc infracon files",
    "phonepe files draft",
    "mobilise app",
    "mobilise app lab limited",
    "fractal industries",
    "shree ram",
    "pride hotels limited",
    "bonfiglioli transmissions limited",
    "clean max",
    "cleanmax enviro",
    "clean max enviro",
    "clean max enviro energy",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.similarity_threshold, 88.0);
        assert!((config.scoring.weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = PipelineConfig::default();
        config.scoring.weights.trend = 0.2;
        assert!(matches!(
            config.validate(),
            Err(PulseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = ScoreWeights {
            sentiment: 0.7,
            consistency: 0.5,
            buzz: -0.3,
            trend: 0.1,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = PipelineConfig::default();
        config.similarity_threshold = 120.0;
        assert!(config.validate().is_err());

        config.similarity_threshold = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signal_thresholds_must_be_ordered() {
        let mut config = PipelineConfig::default();
        config.scoring.signal = SignalThresholds {
            apply: 0.4,
            avoid: 0.6,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_confidence_bands_must_be_ordered() {
        let mut config = PipelineConfig::default();
        config.scoring.confidence = ConfidenceBands {
            high: 0.05,
            medium: 0.1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_junk_views_are_separate() {
        let junk = JunkNames::default();
        assert!(junk.is_entity_junk("Clean Max"));
        assert!(!junk.is_mention_junk("Clean Max"));
        assert!(junk.is_mention_junk("SMEs TO Launch"));
        assert!(!junk.is_entity_junk("SMEs TO Launch"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{"similarity_threshold": 90, "scoring": {"signal": {"apply": 0.6}}}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.similarity_threshold, 90.0);
        assert_eq!(config.scoring.signal.apply, 0.6);
        assert_eq!(config.scoring.signal.avoid, 0.42);
        assert_eq!(config.scoring.weights, ScoreWeights::default());
        assert!(config.names.overrides.contains_key("Clean Max"));
    }
}

//! Scoring weights and matching thresholds, optionally overridden from YAML.
//!
//! ```yaml
//! ranking:
//!   exact_match_bonus: 100
//!   vector_weight: 20
//! matching:
//!   auto_approve_threshold: 0.8
//! ```
//!
//! Every key is optional; omitted keys keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Additive weights used by the relevance ranker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingWeights {
    pub exact_match_bonus: f64,
    pub word_overlap_weight: f64,
    pub brand_match_weight: f64,
    pub vector_weight: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            exact_match_bonus: 100.0,
            word_overlap_weight: 50.0,
            brand_match_weight: 30.0,
            vector_weight: 20.0,
        }
    }
}

/// Thresholds and attribute adjustments for cross-store identity matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingTuning {
    pub size_match_bonus: f64,
    pub brand_match_bonus: f64,
    pub size_mismatch_penalty: f64,
    pub brand_mismatch_penalty: f64,
    /// Identity score at or above which a match is substituted without asking.
    pub auto_approve_threshold: f64,
    /// Identity score below which a candidate is rejected outright.
    pub minimum_score: f64,
    /// Raw similarity below which an index hit never becomes a candidate.
    pub retrieval_floor: f32,
    /// Raw similarity below which a free-text search hit is dropped.
    pub search_floor: f32,
    /// Number of index hits requested per product lookup.
    pub candidate_pool_size: usize,
}

impl Default for MatchingTuning {
    fn default() -> Self {
        Self {
            size_match_bonus: 50.0,
            brand_match_bonus: 40.0,
            size_mismatch_penalty: 80.0,
            brand_mismatch_penalty: 30.0,
            auto_approve_threshold: 0.75,
            minimum_score: 0.40,
            retrieval_floor: 0.40,
            search_floor: 0.50,
            candidate_pool_size: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    pub ranking: RankingWeights,
    pub matching: MatchingTuning,
}

/// Load and validate tuning from a YAML file.
///
/// A missing file is not an error: the defaults are returned and a debug
/// line is logged by the caller if it cares.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_tuning(path: &Path) -> Result<Tuning, ConfigError> {
    if !path.exists() {
        return Ok(Tuning::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TuningFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_tuning(&content)
}

/// Parse and validate tuning from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML or out-of-range values.
pub fn parse_tuning(content: &str) -> Result<Tuning, ConfigError> {
    // An empty document deserializes to `null`, which serde_yaml rejects for a struct.
    if content.trim().is_empty() {
        return Ok(Tuning::default());
    }
    let tuning: Tuning = serde_yaml::from_str(content)?;
    tuning.validate()?;
    Ok(tuning)
}

impl Tuning {
    /// Checks every value is within its meaningful range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.ranking;
        for (name, value) in [
            ("ranking.exact_match_bonus", r.exact_match_bonus),
            ("ranking.word_overlap_weight", r.word_overlap_weight),
            ("ranking.brand_match_weight", r.brand_match_weight),
            ("ranking.vector_weight", r.vector_weight),
        ] {
            non_negative(name, value)?;
        }

        let m = &self.matching;
        for (name, value) in [
            ("matching.size_match_bonus", m.size_match_bonus),
            ("matching.brand_match_bonus", m.brand_match_bonus),
            ("matching.size_mismatch_penalty", m.size_mismatch_penalty),
            ("matching.brand_mismatch_penalty", m.brand_mismatch_penalty),
        ] {
            non_negative(name, value)?;
        }

        for (name, value) in [
            ("matching.auto_approve_threshold", m.auto_approve_threshold),
            ("matching.minimum_score", m.minimum_score),
            ("matching.retrieval_floor", f64::from(m.retrieval_floor)),
            ("matching.search_floor", f64::from(m.search_floor)),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if m.minimum_score > m.auto_approve_threshold {
            return Err(ConfigError::Validation(format!(
                "matching.minimum_score ({}) must not exceed matching.auto_approve_threshold ({})",
                m.minimum_score, m.auto_approve_threshold
            )));
        }

        if m.candidate_pool_size == 0 {
            return Err(ConfigError::Validation(
                "matching.candidate_pool_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{name} must be a finite, non-negative number, got {value}"
        )))
    }
}

//! Cross-store identity confidence.
//!
//! Raw similarity is put on a 0–100 scale, adjusted by size and brand
//! agreement, then mapped back into `[0, 1]`. The adjusted range is
//! roughly `[-110, 190]`; the normalization maps those ends to 0 and 1.

use grocer_core::{MatchingTuning, Product};

use crate::types::{ApprovalTier, IdentityScore};

const SCORE_OFFSET: f64 = 110.0;
const SCORE_RANGE: f64 = 300.0;

/// Outcome of comparing one optional attribute on both products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Agreement {
    Equal,
    Different,
    OneMissing,
    BothMissing,
}

impl Agreement {
    fn of(original: Option<String>, candidate: Option<String>) -> Self {
        match (original, candidate) {
            (Some(a), Some(b)) if a == b => Self::Equal,
            (Some(_), Some(_)) => Self::Different,
            (None, None) => Self::BothMissing,
            _ => Self::OneMissing,
        }
    }

    fn adjustment(self, bonus: f64, penalty: f64) -> f64 {
        match self {
            Self::Equal => bonus,
            Self::Different => -penalty,
            Self::OneMissing => -penalty * 0.5,
            Self::BothMissing => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IdentityScorer {
    tuning: MatchingTuning,
}

impl IdentityScorer {
    #[must_use]
    pub fn new(tuning: MatchingTuning) -> Self {
        Self { tuning }
    }

    /// Scores how likely `candidate` is the same item as `original`.
    #[must_use]
    pub fn score(&self, original: &Product, candidate: &Product, similarity: f32) -> IdentityScore {
        let t = &self.tuning;
        let size = Agreement::of(original.normalized_size(), candidate.normalized_size());
        let brand = Agreement::of(original.normalized_brand(), candidate.normalized_brand());

        let raw = f64::from(similarity) * 100.0
            + size.adjustment(t.size_match_bonus, t.size_mismatch_penalty)
            + brand.adjustment(t.brand_match_bonus, t.brand_mismatch_penalty);
        let score = ((raw + SCORE_OFFSET) / SCORE_RANGE).clamp(0.0, 1.0);

        IdentityScore {
            score,
            size_matched: size == Agreement::Equal,
            brand_matched: brand == Agreement::Equal,
            tier: self.tier(score),
        }
    }

    fn tier(&self, score: f64) -> ApprovalTier {
        if score < self.tuning.minimum_score {
            ApprovalTier::Rejected
        } else if score < self.tuning.auto_approve_threshold {
            ApprovalTier::NeedsApproval
        } else {
            ApprovalTier::AutoApproved
        }
    }
}

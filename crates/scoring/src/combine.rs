//! Score blending and decision classification.

use fraud_core::{Outcome, ReasonTag};

use crate::config::Thresholds;
use crate::rules::RuleOutcome;

/// Model probability at or above which `ml_high_risk` is tagged.
pub const ML_HIGH_RISK_PROBABILITY: f64 = 0.7;

/// Immutable scoring policy: blend weights plus decision thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ScorePolicy {
    pub rule_weight: f64,
    pub ml_weight: f64,
    pub thresholds: Thresholds,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            rule_weight: 0.5,
            ml_weight: 0.5,
            thresholds: Thresholds::default(),
        }
    }
}

impl ScorePolicy {
    /// Weights must be non-negative; they need not sum to one (the clamp
    /// absorbs overrun). Threshold ordering must hold.
    pub fn check(&self) -> Result<(), String> {
        if self.rule_weight < 0.0 || self.ml_weight < 0.0 {
            return Err("blend weights must be non-negative".to_string());
        }
        self.thresholds.check()
    }

    /// Blends the rule score with the model probability into the final
    /// score and reason list.
    ///
    /// An `invalid_amount` hit pins the final score to 100 regardless of
    /// the blend, so a missing or non-positive amount always blocks.
    pub fn combine(&self, rules: &RuleOutcome, probability: f64) -> (f64, Vec<ReasonTag>) {
        let mut reasons = rules.reasons.clone();

        let blended = self.rule_weight * rules.score + self.ml_weight * probability * 100.0;
        let mut score = blended.clamp(0.0, 100.0);
        if rules.bits.invalid_amount {
            score = 100.0;
        }

        if probability >= ML_HIGH_RISK_PROBABILITY
            && self.ml_weight > 0.0
            && !reasons.contains(&ReasonTag::MlHighRisk)
        {
            reasons.push(ReasonTag::MlHighRisk);
        }

        (score, reasons)
    }

    /// Maps a score onto the terminal category. Bounds are inclusive lower
    /// bounds: `score < review` allows, `score >= block` blocks.
    pub fn classify(&self, score: f64) -> Outcome {
        if score < self.thresholds.review {
            Outcome::Allow
        } else if score < self.thresholds.block {
            Outcome::Review
        } else {
            Outcome::Block
        }
    }
}

//! # Classification
//!
//! Maps a feature summary to a label plus a confidence score. The decision
//! itself is a pluggable policy (`DecisionPolicy`); the reference
//! `ThresholdPolicy` is an explicit heuristic stand-in for a trained model.
//! Swapping in a real model touches only the policy implementation, never
//! decoding, extraction, or response assembly.
//!
//! ## Determinism boundaries:
//! - The label and the explanation are pure functions of the summary and the
//!   policy; re-running the same input always yields the same label.
//! - Only the confidence score inside the label's range is randomized, from
//!   one uniform draw per request. The draw comes from a caller-supplied,
//!   request-local generator, so concurrent requests share no RNG state and
//!   tests can pin the draw.

use crate::detection::features::FeatureSummary;
use rand::Rng;
use serde::Serialize;

/// Closed set of classification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    #[serde(rename = "AI_GENERATED")]
    AiGenerated,
    #[serde(rename = "HUMAN")]
    Human,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::AiGenerated => "AI_GENERATED",
            Label::Human => "HUMAN",
        }
    }
}

/// Half-open confidence interval `[base, base + spread)` that a label's
/// score is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceRange {
    pub base: f64,
    pub spread: f64,
}

impl ConfidenceRange {
    /// Map a uniform draw in `[0, 1)` into this range.
    pub fn sample(&self, draw: f64) -> f64 {
        self.base + self.spread * draw
    }
}

/// A decision policy: one pure function from a feature summary to a label
/// and the confidence range to draw from. This is the single substitution
/// point for a future trained model.
pub trait DecisionPolicy {
    fn decide(&self, summary: &FeatureSummary) -> (Label, ConfidenceRange);
}

/// Reference heuristic: synthetic voices hold the spectral centroid
/// unnaturally still, so a centroid variance below the threshold reads as
/// AI generated.
///
/// The threshold is measured in Hz squared (centroid-frequency-squared). The
/// default of 500 000 is a placeholder policy parameter with no trained
/// model behind it.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    threshold: f64,
}

impl ThresholdPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl DecisionPolicy for ThresholdPolicy {
    fn decide(&self, summary: &FeatureSummary) -> (Label, ConfidenceRange) {
        if summary.centroid_variance < self.threshold {
            (Label::AiGenerated, ConfidenceRange { base: 0.85, spread: 0.10 })
        } else {
            (Label::Human, ConfidenceRange { base: 0.92, spread: 0.05 })
        }
    }
}

/// The classification handed to response assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: f64,
    pub explanation: String,
}

/// Classify a feature summary under the given policy.
///
/// Draws exactly one uniform value from `rng` for the confidence score and
/// rounds the result to two decimals. The explanation is fixed per label;
/// the AI-generated text interpolates the declared language.
pub fn classify<R: Rng>(
    summary: &FeatureSummary,
    language: &str,
    policy: &dyn DecisionPolicy,
    rng: &mut R,
) -> ClassificationResult {
    let (label, range) = policy.decide(summary);
    let confidence = round_to_two_decimals(range.sample(rng.gen::<f64>()));

    ClassificationResult {
        label,
        confidence,
        explanation: explanation_for(label, language),
    }
}

/// Fixed explanation text per label. Never randomized.
fn explanation_for(label: Label, language: &str) -> String {
    match label {
        Label::AiGenerated => format!(
            "Unnatural pitch consistency and robotic spectral stability detected in {}",
            language
        ),
        Label::Human => {
            "Natural biological micro-fluctuations and environmental resonance detected.".to_string()
        }
    }
}

fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn summary(variance: f64) -> FeatureSummary {
        FeatureSummary {
            centroid_variance: variance,
            sample_count: 44_100,
            mfcc_stability: 1.0,
        }
    }

    #[test]
    fn low_variance_is_ai_generated() {
        let policy = ThresholdPolicy::new(500_000.0);
        let (label, _) = policy.decide(&summary(1_000.0));
        assert_eq!(label, Label::AiGenerated);
    }

    #[test]
    fn high_variance_is_human() {
        let policy = ThresholdPolicy::new(500_000.0);
        let (label, _) = policy.decide(&summary(2_000_000.0));
        assert_eq!(label, Label::Human);
    }

    #[test]
    fn variance_exactly_at_threshold_is_human() {
        let policy = ThresholdPolicy::new(500_000.0);
        let (label, _) = policy.decide(&summary(500_000.0));
        assert_eq!(label, Label::Human);
    }

    #[test]
    fn label_is_independent_of_the_rng() {
        let policy = ThresholdPolicy::new(500_000.0);
        let features = summary(10.0);

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = classify(&features, "English", &policy, &mut rng);
            assert_eq!(result.label, Label::AiGenerated);
        }
    }

    #[test]
    fn ai_confidence_is_drawn_from_its_range() {
        // [0.85, 0.95) before rounding.
        let range = ConfidenceRange { base: 0.85, spread: 0.10 };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let raw = range.sample(rng.gen::<f64>());
            assert!((0.85..0.95).contains(&raw), "raw score {} out of range", raw);
        }
    }

    #[test]
    fn human_confidence_is_drawn_from_its_range() {
        // [0.92, 0.97) before rounding.
        let range = ConfidenceRange { base: 0.92, spread: 0.05 };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let raw = range.sample(rng.gen::<f64>());
            assert!((0.92..0.97).contains(&raw), "raw score {} out of range", raw);
        }
    }

    #[test]
    fn pinned_draws_round_to_expected_scores() {
        let ai = ConfidenceRange { base: 0.85, spread: 0.10 };
        assert_eq!(round_to_two_decimals(ai.sample(0.0)), 0.85);
        assert_eq!(round_to_two_decimals(ai.sample(0.2)), 0.87);

        let human = ConfidenceRange { base: 0.92, spread: 0.05 };
        assert_eq!(round_to_two_decimals(human.sample(0.0)), 0.92);
        assert_eq!(round_to_two_decimals(human.sample(0.2)), 0.93);
    }

    #[test]
    fn rounded_confidence_stays_within_unit_interval() {
        let policy = ThresholdPolicy::new(500_000.0);
        let mut rng = StdRng::seed_from_u64(99);

        for variance in [10.0, 9_000_000.0] {
            for _ in 0..500 {
                let result = classify(&summary(variance), "Tamil", &policy, &mut rng);
                assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
                assert_eq!(result.confidence, round_to_two_decimals(result.confidence));
            }
        }
    }

    #[test]
    fn ai_explanation_interpolates_the_language() {
        let policy = ThresholdPolicy::new(500_000.0);
        let mut rng = StdRng::seed_from_u64(1);
        let result = classify(&summary(10.0), "Malayalam", &policy, &mut rng);
        assert!(result.explanation.contains("Malayalam"));
    }

    #[test]
    fn human_explanation_is_fixed_text() {
        let policy = ThresholdPolicy::new(500_000.0);
        let mut rng = StdRng::seed_from_u64(1);
        let result = classify(&summary(9_000_000.0), "Hindi", &policy, &mut rng);
        assert_eq!(
            result.explanation,
            "Natural biological micro-fluctuations and environmental resonance detected."
        );
    }

    #[test]
    fn label_serializes_to_wire_names() {
        assert_eq!(serde_json::to_string(&Label::AiGenerated).unwrap(), "\"AI_GENERATED\"");
        assert_eq!(serde_json::to_string(&Label::Human).unwrap(), "\"HUMAN\"");
    }
}

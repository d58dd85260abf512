//! Prediction inputs, results, and the assembly step shared by every engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::estimation::keywords::combined_text;
use crate::estimation::rules::RuleChain;

/// Lower bound for the minimum of the estimate range, in hours.
pub const MIN_RANGE_HOURS: f64 = 0.5;
/// Rounded estimates above this suggest a technical spike.
pub const SPIKE_THRESHOLD_HOURS: f64 = 15.0;
/// Fixed outlier threshold; estimates at 80% of it are flagged.
pub const OUTLIER_THRESHOLD_HOURS: f64 = 20.0;
const OUTLIER_FRACTION: f64 = 0.8;

pub const SPIKE_ADVISORY: &str = "Estimate above 15h - consider a technical spike";
pub const NO_HISTORY_ADVISORY: &str = "Client without history - wide range";
pub const OUTLIER_ADVISORY: &str = "Possible outlier - review complexity";

/// How much client-specific history backs the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Interpret a stored confidence label. Anything unrecognized is Low.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "alta" | "high" => Self::High,
            "media" | "medium" => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for an estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub client: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

impl PredictionInput {
    pub fn new(client: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            summary: summary.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Summary and description joined for keyword extraction.
    pub fn text(&self) -> String {
        combined_text(&self.summary, &self.description)
    }

    /// Reject requests the surfaces should not forward to an engine.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.summary.trim().is_empty() {
            return Err(InputError::MissingSummary);
        }
        Ok(())
    }
}

/// An effort estimate. Hour values are multiples of a quarter hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub central_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
    pub confidence: Confidence,
    /// How the baseline was chosen.
    pub method: String,
    /// Applied rules followed by advisories.
    pub rationale_factors: Vec<String>,
    pub historical_case_count: usize,
    pub unadjusted_base_hours: f64,
}

/// Baseline and uncertainty selected from the statistics before any rule runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub hours: f64,
    pub spread: f64,
    pub confidence: Confidence,
    pub method: String,
    pub case_count: usize,
}

/// Which advisory flags an engine attaches after rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryPolicy {
    /// Spike, no-history and outlier advisories.
    Full,
    /// Only the no-history advisory.
    NoHistoryOnly,
}

impl AdvisoryPolicy {
    fn advisories(&self, central_hours: f64, confidence: Confidence) -> Vec<String> {
        let mut advisories = Vec::new();
        let full = matches!(self, Self::Full);

        if full && central_hours > SPIKE_THRESHOLD_HOURS {
            advisories.push(SPIKE_ADVISORY.to_string());
        }
        if confidence == Confidence::Low {
            advisories.push(NO_HISTORY_ADVISORY.to_string());
        }
        if full && central_hours >= OUTLIER_THRESHOLD_HOURS * OUTLIER_FRACTION {
            advisories.push(OUTLIER_ADVISORY.to_string());
        }
        advisories
    }
}

/// Round to the nearest quarter hour, ties to even.
pub fn round_quarter(hours: f64) -> f64 {
    (hours * 4.0).round_ties_even() / 4.0
}

/// Apply the rule multiplier to the baseline, build the range, round every
/// value from its own unrounded source, and append advisories.
pub fn assemble(baseline: Baseline, chain: RuleChain, policy: AdvisoryPolicy) -> PredictionResult {
    let (multiplier, mut factors) = chain.into_parts();

    let central = baseline.hours * multiplier;
    let min = (central - baseline.spread).max(MIN_RANGE_HOURS);
    // keep the range ordered when the baseline sits below the floor
    let max = (central + baseline.spread).max(min);

    let central_hours = round_quarter(central);
    factors.extend(policy.advisories(central_hours, baseline.confidence));

    PredictionResult {
        central_hours,
        min_hours: round_quarter(min),
        max_hours: round_quarter(max),
        confidence: baseline.confidence,
        method: baseline.method,
        rationale_factors: factors,
        historical_case_count: baseline.case_count,
        unadjusted_base_hours: round_quarter(baseline.hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(hours: f64, spread: f64, confidence: Confidence) -> Baseline {
        Baseline {
            hours,
            spread,
            confidence,
            method: "test".to_string(),
            case_count: 7,
        }
    }

    #[test]
    fn test_round_quarter() {
        assert_eq!(round_quarter(3.6), 3.5);
        assert_eq!(round_quarter(8.4), 8.5);
        assert_eq!(round_quarter(6.0), 6.0);
        assert_eq!(round_quarter(1.13), 1.25);
        // ties go to the even quarter count
        assert_eq!(round_quarter(0.125), 0.0);
        assert_eq!(round_quarter(0.375), 0.5);
    }

    #[test]
    fn test_confidence_from_label() {
        assert_eq!(Confidence::from_label("Alta"), Confidence::High);
        assert_eq!(Confidence::from_label("media"), Confidence::Medium);
        assert_eq!(Confidence::from_label("High"), Confidence::High);
        assert_eq!(Confidence::from_label("Baja"), Confidence::Low);
        assert_eq!(Confidence::from_label(""), Confidence::Low);
    }

    #[test]
    fn test_validate_requires_summary() {
        assert_eq!(
            PredictionInput::new("Acme", "   ").validate(),
            Err(InputError::MissingSummary)
        );
        assert!(PredictionInput::new("Acme", "error").validate().is_ok());
    }

    #[test]
    fn test_input_text_joins_with_space() {
        let input = PredictionInput::new("Acme", "error IRPF").with_description("en planilla");
        assert_eq!(input.text(), "error IRPF en planilla");
        assert_eq!(PredictionInput::new("Acme", "solo").text(), "solo ");
    }

    #[test]
    fn test_assemble_rounds_each_value_independently() {
        let mut chain = RuleChain::new();
        chain.apply(1.1, "x");
        let result = assemble(baseline(3.0, 1.2, Confidence::High), chain, AdvisoryPolicy::Full);

        // central 3.3, min 2.1, max 4.5
        assert_eq!(result.central_hours, 3.25);
        assert_eq!(result.min_hours, 2.0);
        assert_eq!(result.max_hours, 4.5);
        assert_eq!(result.unadjusted_base_hours, 3.0);
        assert_eq!(result.rationale_factors, vec!["x"]);
        assert_eq!(result.historical_case_count, 7);
    }

    #[test]
    fn test_assemble_floors_minimum() {
        let result = assemble(
            baseline(1.0, 3.0, Confidence::Medium),
            RuleChain::new(),
            AdvisoryPolicy::Full,
        );
        assert_eq!(result.min_hours, 0.5);
        assert_eq!(result.max_hours, 4.0);
    }

    #[test]
    fn test_assemble_keeps_range_ordered_below_floor() {
        let result = assemble(
            baseline(0.25, 0.0, Confidence::High),
            RuleChain::new(),
            AdvisoryPolicy::Full,
        );
        assert_eq!(result.central_hours, 0.25);
        assert_eq!(result.min_hours, 0.5);
        assert_eq!(result.max_hours, 0.5);
    }

    #[test]
    fn test_full_advisories_in_order() {
        let mut chain = RuleChain::new();
        chain.apply(2.0, "double");
        let result = assemble(baseline(9.0, 1.0, Confidence::Low), chain, AdvisoryPolicy::Full);

        assert_eq!(result.central_hours, 18.0);
        assert_eq!(
            result.rationale_factors,
            vec![
                "double",
                SPIKE_ADVISORY,
                NO_HISTORY_ADVISORY,
                OUTLIER_ADVISORY
            ]
        );
    }

    #[test]
    fn test_outlier_advisory_threshold() {
        let result = assemble(
            baseline(16.0, 1.0, Confidence::High),
            RuleChain::new(),
            AdvisoryPolicy::Full,
        );
        assert_eq!(result.rationale_factors, vec![SPIKE_ADVISORY, OUTLIER_ADVISORY]);

        let result = assemble(
            baseline(15.0, 1.0, Confidence::High),
            RuleChain::new(),
            AdvisoryPolicy::Full,
        );
        assert!(result.rationale_factors.is_empty());
    }

    #[test]
    fn test_no_history_only_policy() {
        let result = assemble(
            baseline(30.0, 1.0, Confidence::Low),
            RuleChain::new(),
            AdvisoryPolicy::NoHistoryOnly,
        );
        assert_eq!(result.rationale_factors, vec![NO_HISTORY_ADVISORY]);
    }
}

//! Recommendations attached to a prediction for the person planning the work.

use serde::Serialize;

use crate::estimation::prediction::{Confidence, PredictionResult};

/// Central estimates above this get a follow-up checklist.
pub const CHECKLIST_THRESHOLD_HOURS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceLevel {
    Success,
    Warning,
}

/// Recommendation for a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
    pub level: AdviceLevel,
    pub message: String,
    /// Follow-up steps for large estimates; empty otherwise.
    pub checklist: Vec<String>,
}

/// Derive a recommendation from the confidence tier and size of an estimate.
pub fn advise(result: &PredictionResult) -> Advice {
    let (level, message) = match result.confidence {
        Confidence::High => (
            AdviceLevel::Success,
            format!(
                "Reliable estimate based on {} historical cases for this client.",
                result.historical_case_count
            ),
        ),
        Confidence::Medium => (
            AdviceLevel::Warning,
            "Moderate estimate. Review with the team before committing.".to_string(),
        ),
        Confidence::Low => (
            AdviceLevel::Warning,
            "Low confidence. The client lacks enough history; consider a 2-4h technical spike \
             for initial analysis."
                .to_string(),
        ),
    };

    let checklist = if result.central_hours > CHECKLIST_THRESHOLD_HOURS {
        vec![
            "Split into subtasks".to_string(),
            "Technical review with a senior".to_string(),
            "Validate access and permissions with the client".to_string(),
        ]
    } else {
        Vec::new()
    };

    Advice {
        level,
        message,
        checklist,
    }
}

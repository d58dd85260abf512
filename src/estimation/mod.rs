//! Effort estimation for reported payroll defects.
//!
//! Estimates combine:
//! - A robust baseline from historical resolution times (median and mean
//!   absolute deviation), tiered by how much client history exists
//! - Multiplicative business rules triggered by keywords in the bug text
//! - Quarter-hour rounding and advisory flags
//!
//! Two engines implement [`EffortEstimator`], one per product line:
//! [`HistoricalEstimator`] computes statistics from raw records, and
//! [`ConfiguredEstimator`] reads them from a model configuration.

mod advice;
mod configured;
mod historical;
mod keywords;
mod prediction;
mod rules;
mod stats;

pub use advice::{Advice, AdviceLevel, CHECKLIST_THRESHOLD_HOURS, advise};
pub use configured::{ClientEntry, ClientProfile, ConfiguredEstimator, GlobalSection, ModelConfig};
pub use historical::{HIGH_CONFIDENCE_CASES, HistoricalEstimator, HistoricalRecord, read_records};
pub use keywords::{
    KeywordRule, KeywordTable, PayrollKeywords, PayrollSignals, combined_text, token_count,
};
pub use prediction::{
    AdvisoryPolicy, Baseline, Confidence, MIN_RANGE_HOURS, NO_HISTORY_ADVISORY, OUTLIER_ADVISORY,
    OUTLIER_THRESHOLD_HOURS, PredictionInput, PredictionResult, SPIKE_ADVISORY,
    SPIKE_THRESHOLD_HOURS, assemble, round_quarter,
};
pub use rules::{RuleChain, SPECIAL_CLIENT, keyword_label, keyword_rules, payroll_rules};
pub use stats::{ClientStats, ClientStatsTable, GlobalStats, MIN_CLIENT_CASES};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{InputError, LoadError};

/// Product line an estimate is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    /// Estimated from the historical dataset.
    Diecisiete,
    /// Estimated from the precomputed model configuration.
    Diez,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diecisiete => f.write_str("Payroll Diecisiete"),
            Self::Diez => f.write_str("Payroll Diez"),
        }
    }
}

impl FromStr for Product {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "diecisiete" | "17" | "payroll diecisiete" => Ok(Self::Diecisiete),
            "diez" | "10" | "payroll diez" => Ok(Self::Diez),
            _ => Err(InputError::UnknownProduct(s.to_string())),
        }
    }
}

/// Headline figures about an engine's backing data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSummary {
    pub product: Product,
    /// Name of the spread statistic ("MAE" or "MAD").
    pub spread_label: &'static str,
    pub global_median: f64,
    pub global_spread: f64,
    pub total_cases: u64,
    pub example_keywords: Vec<String>,
}

/// Shared prediction interface.
///
/// Implementations are immutable after construction; `predict` is a pure
/// function of the engine and the input.
pub trait EffortEstimator: Send + Sync {
    fn product(&self) -> Product;

    /// Estimate effort. Unknown clients fall back to global statistics.
    fn predict(&self, input: &PredictionInput) -> PredictionResult;

    /// Known clients, sorted.
    fn clients(&self) -> Vec<&str>;

    fn summary(&self) -> EngineSummary;
}

/// Both engines, loaded once at startup and shared read-only afterwards.
#[derive(Debug)]
pub struct Engines {
    historical: HistoricalEstimator,
    configured: ConfiguredEstimator,
}

impl Engines {
    pub fn new(historical: HistoricalEstimator, configured: ConfiguredEstimator) -> Self {
        Self {
            historical,
            configured,
        }
    }

    /// Load both engines. Any failure aborts the whole load.
    pub fn load(config: &EngineConfig) -> Result<Self, LoadError> {
        let historical = HistoricalEstimator::load(&config.history_path)?;
        let model_path = config.resolve_model_config()?;
        let configured = ConfiguredEstimator::load(&model_path)?;
        Ok(Self::new(historical, configured))
    }

    /// Load only the engine serving one product line.
    pub fn load_one(
        config: &EngineConfig,
        product: Product,
    ) -> Result<Box<dyn EffortEstimator>, LoadError> {
        let engine: Box<dyn EffortEstimator> = match product {
            Product::Diecisiete => Box::new(HistoricalEstimator::load(&config.history_path)?),
            Product::Diez => Box::new(ConfiguredEstimator::load(
                &config.resolve_model_config()?,
            )?),
        };
        Ok(engine)
    }

    /// The engine serving a product line.
    pub fn get(&self, product: Product) -> &dyn EffortEstimator {
        match product {
            Product::Diecisiete => &self.historical,
            Product::Diez => &self.configured,
        }
    }

    pub fn historical(&self) -> &HistoricalEstimator {
        &self.historical
    }

    pub fn configured(&self) -> &ConfiguredEstimator {
        &self.configured
    }
}

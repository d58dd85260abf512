//! Estimator driven by a precomputed model configuration.
//!
//! The configuration is a JSON document:
//!
//! ```json
//! {
//!   "global": { "mediana": 3.5, "mad": 1.75 },
//!   "keywords": { "recibo": 1.2, "liquidacion_final": "1.4" },
//!   "clientes": { "Acme": { "med": 4.0, "mad": 1.0, "conf": "Alta", "n": 12 } },
//!   "n_bugs": 140
//! }
//! ```
//!
//! Keyword order in the document is kept. Keyword multipliers that do not
//! parse as a positive number are skipped. Counts may be written as floats
//! or numeric strings and are truncated. A client entry with no fields is
//! treated as having no history.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::estimation::keywords::{KeywordRule, KeywordTable};
use crate::estimation::prediction::{
    AdvisoryPolicy, Baseline, Confidence, PredictionInput, PredictionResult, assemble,
};
use crate::estimation::rules::keyword_rules;
use crate::estimation::stats::GlobalStats;
use crate::estimation::{EffortEstimator, EngineSummary, Product};

const DEFAULT_CONFIDENCE_LABEL: &str = "Media";

/// Raw model configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub global: Option<GlobalSection>,
    #[serde(default)]
    pub keywords: Map<String, Value>,
    #[serde(default)]
    pub clientes: BTreeMap<String, ClientEntry>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub n_bugs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GlobalSection {
    pub mediana: f64,
    pub mad: f64,
}

/// Per-client entry. Missing fields fall back to the global values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientEntry {
    #[serde(default)]
    pub med: Option<f64>,
    #[serde(default)]
    pub mad: Option<f64>,
    #[serde(default)]
    pub conf: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_count")]
    pub n: Option<u64>,
}

impl ClientEntry {
    pub fn is_empty(&self) -> bool {
        self.med.is_none() && self.mad.is_none() && self.conf.is_none() && self.n.is_none()
    }
}

/// Resolved per-client profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientProfile {
    pub median: f64,
    pub spread: f64,
    /// Confidence label as stored in the configuration.
    pub confidence_label: String,
    pub cases: usize,
}

impl ModelConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Estimator with precomputed client statistics and configured keywords.
#[derive(Debug)]
pub struct ConfiguredEstimator {
    global: GlobalStats,
    /// `None` for clients listed without any statistics.
    clients: BTreeMap<String, Option<ClientProfile>>,
    keywords: KeywordTable,
    total_cases: u64,
}

impl ConfiguredEstimator {
    /// Build from a parsed configuration.
    pub fn from_config(config: ModelConfig) -> Result<Self, LoadError> {
        let global = config.global.ok_or_else(|| LoadError::MissingSection {
            section: "global".to_string(),
        })?;
        let global = GlobalStats {
            median: global.mediana,
            spread: global.mad,
        };

        let clients = config
            .clientes
            .into_iter()
            .map(|(name, entry)| {
                if entry.is_empty() {
                    return (name, None);
                }
                let profile = ClientProfile {
                    median: entry.med.unwrap_or(global.median),
                    spread: entry.mad.unwrap_or(global.spread),
                    confidence_label: entry
                        .conf
                        .unwrap_or_else(|| DEFAULT_CONFIDENCE_LABEL.to_string()),
                    cases: entry.n.unwrap_or_default() as usize,
                };
                (name, Some(profile))
            })
            .collect();

        let mut rules = Vec::with_capacity(config.keywords.len());
        for (keyword, value) in config.keywords {
            match parse_multiplier(&value) {
                Some(multiplier) => rules.push(KeywordRule {
                    keyword,
                    multiplier,
                }),
                None => {
                    tracing::debug!("Skipping keyword '{}': bad multiplier {}", keyword, value)
                }
            }
        }
        let keywords = KeywordTable::new(rules).map_err(|e| LoadError::Keywords {
            reason: e.to_string(),
        })?;

        Ok(Self {
            global,
            clients,
            keywords,
            total_cases: config.n_bugs,
        })
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ModelConfig::from_json(&json).map_err(|e| LoadError::Json {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let estimator = Self::from_config(config)?;

        tracing::info!(
            "Loaded model configuration with {} clients and {} keywords from {}",
            estimator.clients.len(),
            estimator.keywords.len(),
            path.display()
        );
        Ok(estimator)
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn profile(&self, client: &str) -> Option<&ClientProfile> {
        self.clients.get(client).and_then(Option::as_ref)
    }

    fn baseline(&self, client: &str) -> Baseline {
        match self.profile(client) {
            Some(profile) => Baseline {
                hours: profile.median,
                spread: profile.spread,
                confidence: Confidence::from_label(&profile.confidence_label),
                method: if profile.cases > 0 {
                    format!("Client median ({} cases)", profile.cases)
                } else {
                    "Client median".to_string()
                },
                case_count: profile.cases,
            },
            None => Baseline {
                hours: self.global.median,
                spread: self.global.spread,
                confidence: Confidence::Low,
                method: "Global median (no history)".to_string(),
                case_count: 0,
            },
        }
    }
}

impl EffortEstimator for ConfiguredEstimator {
    fn product(&self) -> Product {
        Product::Diez
    }

    fn predict(&self, input: &PredictionInput) -> PredictionResult {
        let baseline = self.baseline(&input.client);
        let chain = keyword_rules(self.keywords.matches(&input.text()));
        assemble(baseline, chain, AdvisoryPolicy::NoHistoryOnly)
    }

    fn clients(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    fn summary(&self) -> EngineSummary {
        EngineSummary {
            product: self.product(),
            spread_label: "MAD",
            global_median: self.global.median,
            global_spread: self.global.spread,
            total_cases: self.total_cases,
            example_keywords: self
                .keywords
                .rules()
                .iter()
                .take(3)
                .map(|r| r.keyword.clone())
                .collect(),
        }
    }
}

/// Numeric multipliers, or numeric strings. Non-finite and non-positive values are rejected.
fn parse_multiplier(value: &Value) -> Option<f64> {
    let multiplier = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (multiplier.is_finite() && multiplier > 0.0).then_some(multiplier)
}

/// Integers, floats (truncated) or numeric strings. Negative and non-finite values are rejected.
fn parse_count(value: &Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    let count: f64 = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (count.is_finite() && count >= 0.0).then_some(count.trunc() as u64)
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_count(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid count: {}", value)))
}

fn deserialize_optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => parse_count(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid count: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::estimation::prediction::NO_HISTORY_ADVISORY;

    fn estimator(config: Value) -> ConfiguredEstimator {
        let config: ModelConfig = serde_json::from_value(config).unwrap();
        ConfiguredEstimator::from_config(config).unwrap()
    }

    fn sample() -> ConfiguredEstimator {
        estimator(json!({
            "global": { "mediana": 4.0, "mad": 2.0 },
            "keywords": {
                "recibo": 1.5,
                "error_fatal": "2",
                "roto": "abc",
                "nulo": null,
                "neutro": 1.0
            },
            "clientes": {
                "Acme": { "med": 8.0, "mad": 1.0, "conf": "Alta", "n": 12 },
                "Nuevo": { "conf": "Baja" },
                "Parcial": { "med": 2.0 }
            },
            "n_bugs": 140
        }))
    }

    #[test]
    fn test_parse_multiplier() {
        assert_eq!(parse_multiplier(&json!(1.25)), Some(1.25));
        assert_eq!(parse_multiplier(&json!(" 1.5 ")), Some(1.5));
        assert_eq!(parse_multiplier(&json!("x")), None);
        assert_eq!(parse_multiplier(&json!(null)), None);
        assert_eq!(parse_multiplier(&json!([1.2])), None);
        assert_eq!(parse_multiplier(&json!(0)), None);
        assert_eq!(parse_multiplier(&json!("NaN")), None);
    }

    #[test]
    fn test_malformed_multipliers_are_skipped() {
        let est = sample();
        let names: Vec<&str> = est
            .keywords()
            .rules()
            .iter()
            .map(|r| r.keyword.as_str())
            .collect();
        assert_eq!(names, vec!["recibo", "error_fatal", "neutro"]);
    }

    #[test]
    fn test_known_client_uses_stored_confidence() {
        let est = sample();
        let result = est.predict(&PredictionInput::new("Acme", "Falla en RECIBOS"));

        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.central_hours, 12.0);
        assert_eq!(result.min_hours, 11.0);
        assert_eq!(result.max_hours, 13.0);
        assert_eq!(result.method, "Client median (12 cases)");
        assert_eq!(result.historical_case_count, 12);
        assert_eq!(result.unadjusted_base_hours, 8.0);
        assert_eq!(result.rationale_factors, vec!["Recibo (+50%)"]);
    }

    #[test]
    fn test_keyword_labels_and_neutral_multiplier() {
        let est = sample();
        let result = est.predict(
            &PredictionInput::new("Acme", "error fatal").with_description("error_fatal en neutro"),
        );

        assert_eq!(result.central_hours, 16.0);
        assert_eq!(result.rationale_factors, vec!["Error Fatal (+100%)", "Neutro"]);
    }

    #[test]
    fn test_unrecognized_label_downgrades_to_low() {
        let est = sample();
        let result = est.predict(&PredictionInput::new("Nuevo", "algo"));

        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.method, "Client median");
        assert_eq!(result.central_hours, 4.0);
        assert_eq!(result.rationale_factors, vec![NO_HISTORY_ADVISORY]);
    }

    #[test]
    fn test_partial_entry_defaults() {
        let est = sample();
        let profile = est.profile("Parcial").unwrap();

        assert_eq!(profile.median, 2.0);
        assert_eq!(profile.spread, 2.0);
        assert_eq!(profile.confidence_label, "Media");
        assert_eq!(profile.cases, 0);

        let result = est.predict(&PredictionInput::new("Parcial", "algo"));
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.min_hours, 0.5);
        assert!(result.rationale_factors.is_empty());
    }

    #[test]
    fn test_unknown_client_falls_back_to_global() {
        let est = sample();
        let result = est.predict(&PredictionInput::new("Otro", "recibo"));

        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.method, "Global median (no history)");
        assert_eq!(result.central_hours, 6.0);
        assert_eq!(result.min_hours, 4.0);
        assert_eq!(result.max_hours, 8.0);
        assert_eq!(
            result.rationale_factors,
            vec!["Recibo (+50%)", NO_HISTORY_ADVISORY]
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(&json!(12)), Some(12));
        assert_eq!(parse_count(&json!(12.0)), Some(12));
        assert_eq!(parse_count(&json!(12.9)), Some(12));
        assert_eq!(parse_count(&json!(" 140 ")), Some(140));
        assert_eq!(parse_count(&json!("140.0")), Some(140));
        assert_eq!(parse_count(&json!(-1)), None);
        assert_eq!(parse_count(&json!("muchos")), None);
        assert_eq!(parse_count(&json!(true)), None);
    }

    #[test]
    fn test_float_counts_load() {
        let config = ModelConfig::from_json(
            r#"{
                "global": { "mediana": 4.0, "mad": 2.0 },
                "clientes": {
                    "Acme": { "med": 8.0, "mad": 1.0, "conf": "Alta", "n": 12.0 },
                    "Beta": { "med": 3.0, "n": null }
                },
                "n_bugs": 140.0
            }"#,
        )
        .unwrap();
        assert_eq!(config.n_bugs, 140);
        assert_eq!(config.clientes["Acme"].n, Some(12));
        assert_eq!(config.clientes["Beta"].n, None);

        let est = ConfiguredEstimator::from_config(config).unwrap();
        assert_eq!(est.summary().total_cases, 140);
        assert_eq!(
            est.predict(&PredictionInput::new("Acme", "algo")).method,
            "Client median (12 cases)"
        );
    }

    #[test]
    fn test_invalid_count_is_rejected() {
        let result =
            ModelConfig::from_json(r#"{"global": {"mediana": 1.0, "mad": 1.0}, "n_bugs": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_client_entry_falls_back_to_global() {
        let est = estimator(json!({
            "global": { "mediana": 4.0, "mad": 2.0 },
            "clientes": { "Vacio": {}, "Acme": { "med": 8.0, "conf": "Alta" } }
        }));

        assert!(est.profile("Vacio").is_none());
        assert_eq!(est.clients(), vec!["Acme", "Vacio"]);

        let result = est.predict(&PredictionInput::new("Vacio", "algo"));
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.method, "Global median (no history)");
        assert_eq!(result.central_hours, 4.0);
        assert_eq!(result.rationale_factors, vec![NO_HISTORY_ADVISORY]);
    }

    #[test]
    fn test_missing_global_section() {
        let config: ModelConfig = serde_json::from_value(json!({ "keywords": {} })).unwrap();
        let err = ConfiguredEstimator::from_config(config).unwrap_err();
        assert!(matches!(err, LoadError::MissingSection { section } if section == "global"));
    }

    #[test]
    fn test_summary_and_clients() {
        let est = sample();
        assert_eq!(est.clients(), vec!["Acme", "Nuevo", "Parcial"]);

        let summary = est.summary();
        assert_eq!(summary.spread_label, "MAD");
        assert_eq!(summary.total_cases, 140);
        assert_eq!(summary.global_spread, 2.0);
        assert_eq!(
            summary.example_keywords,
            vec!["recibo", "error_fatal", "neutro"]
        );
    }
}

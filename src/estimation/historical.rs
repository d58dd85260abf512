//! Estimator backed by a dataset of resolved issues.
//!
//! Statistics are computed once from the raw records; predictions pick a
//! baseline tier by how many cases the client has and apply the fixed
//! payroll rule sequence.

use std::fs::File;
use std::path::Path;

use crate::error::LoadError;
use crate::estimation::keywords::{PayrollKeywords, token_count};
use crate::estimation::prediction::{
    AdvisoryPolicy, Baseline, Confidence, PredictionInput, PredictionResult, assemble,
};
use crate::estimation::rules::payroll_rules;
use crate::estimation::stats::ClientStatsTable;
use crate::estimation::{EffortEstimator, EngineSummary, Product};

/// Cases needed before a client's own median is trusted on its own.
pub const HIGH_CONFIDENCE_CASES: usize = 5;

const CLIENT_COLUMNS: &[&str] = &["cliente", "client"];
const HOURS_COLUMNS: &[&str] = &["worklog_hours", "hours"];

/// One resolved issue.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub client: String,
    pub hours: f64,
}

impl HistoricalRecord {
    pub fn new(client: impl Into<String>, hours: f64) -> Self {
        Self {
            client: client.into(),
            hours,
        }
    }
}

/// Read resolved-issue records from a CSV file with a header row.
///
/// The client column may be named `cliente` or `client`, and the hours column
/// `worklog_hours` or `hours`. Other columns are ignored.
pub fn read_records(path: &Path) -> Result<Vec<HistoricalRecord>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let csv_error = |e: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let find_column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: names[0].to_string(),
            })
    };
    let client_idx = find_column(CLIENT_COLUMNS)?;
    let hours_idx = find_column(HOURS_COLUMNS)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let invalid = |reason: String| LoadError::InvalidRecord {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let client = row.get(client_idx).unwrap_or_default();
        if client.is_empty() {
            return Err(invalid("empty client".to_string()));
        }

        let raw_hours = row.get(hours_idx).unwrap_or_default();
        let hours: f64 = raw_hours
            .parse()
            .map_err(|_| invalid(format!("hours '{}' is not a number", raw_hours)))?;
        if !hours.is_finite() || hours <= 0.0 {
            return Err(invalid(format!("hours '{}' out of range", raw_hours)));
        }

        records.push(HistoricalRecord::new(client, hours));
    }

    if records.is_empty() {
        return Err(LoadError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }
    Ok(records)
}

/// Estimator that derives its statistics from historical records.
#[derive(Debug)]
pub struct HistoricalEstimator {
    table: ClientStatsTable,
    keywords: PayrollKeywords,
}

impl HistoricalEstimator {
    pub fn new(table: ClientStatsTable) -> Self {
        Self {
            table,
            keywords: PayrollKeywords::new(),
        }
    }

    /// Build from in-memory records. `None` when there are no records.
    pub fn from_records(records: &[HistoricalRecord]) -> Option<Self> {
        ClientStatsTable::build(records).map(Self::new)
    }

    /// Load and compute statistics from a CSV dataset.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let records = read_records(path)?;
        let table = ClientStatsTable::build(&records).ok_or_else(|| LoadError::EmptyDataset {
            path: path.to_path_buf(),
        })?;

        tracing::info!(
            "Loaded {} historical cases for {} clients from {}",
            table.total_cases(),
            table.clients().len(),
            path.display()
        );
        Ok(Self::new(table))
    }

    pub fn table(&self) -> &ClientStatsTable {
        &self.table
    }

    /// Pick baseline and spread by the client's case count, first match wins.
    fn baseline(&self, client: &str) -> Baseline {
        let global = self.table.global();

        match self.table.get(client) {
            Some(stats) if stats.count >= HIGH_CONFIDENCE_CASES => Baseline {
                hours: stats.median,
                spread: stats.spread,
                confidence: Confidence::High,
                method: format!("Client median ({} cases)", stats.count),
                case_count: stats.count,
            },
            Some(stats) => Baseline {
                hours: (stats.median + global.median) / 2.0,
                spread: (stats.spread + global.spread) / 2.0,
                confidence: Confidence::Medium,
                method: format!("Hybrid ({} cases)", stats.count),
                case_count: stats.count,
            },
            None => Baseline {
                hours: global.median,
                spread: global.spread,
                confidence: Confidence::Low,
                method: "Global median (no history)".to_string(),
                case_count: 0,
            },
        }
    }
}

impl EffortEstimator for HistoricalEstimator {
    fn product(&self) -> Product {
        Product::Diecisiete
    }

    fn predict(&self, input: &PredictionInput) -> PredictionResult {
        let baseline = self.baseline(&input.client);

        let text = input.text();
        let signals = self.keywords.extract(&text);
        let chain = payroll_rules(&input.client, &signals, token_count(&text));

        assemble(baseline, chain, AdvisoryPolicy::Full)
    }

    fn clients(&self) -> Vec<&str> {
        self.table.clients()
    }

    fn summary(&self) -> EngineSummary {
        let global = self.table.global();
        EngineSummary {
            product: self.product(),
            spread_label: "MAE",
            global_median: global.median,
            global_spread: global.spread,
            total_cases: self.table.total_cases() as u64,
            example_keywords: vec![
                "IRPF".to_string(),
                "licencias".to_string(),
                "masivo".to_string(),
            ],
        }
    }
}

//! Robust per-client statistics over historical resolution times.

use std::collections::HashMap;

use serde::Serialize;

use crate::estimation::historical::HistoricalRecord;

/// Minimum number of cases before a client gets its own statistics.
pub const MIN_CLIENT_CASES: usize = 3;

/// Location and spread of one client's resolution times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClientStats {
    /// Median hours.
    pub median: f64,
    /// Mean absolute deviation from the median.
    pub spread: f64,
    /// Number of historical cases.
    pub count: usize,
    /// 25th percentile (linear interpolation).
    pub p25: f64,
    /// 75th percentile (linear interpolation).
    pub p75: f64,
}

impl ClientStats {
    /// Compute statistics, or `None` when there are fewer than
    /// [`MIN_CLIENT_CASES`] observations.
    pub fn from_hours(hours: &[f64]) -> Option<Self> {
        if hours.len() < MIN_CLIENT_CASES {
            return None;
        }
        let sorted = sorted(hours);
        let median = percentile(&sorted, 0.5);

        Some(Self {
            median,
            spread: mean_absolute_deviation(&sorted, median),
            count: sorted.len(),
            p25: percentile(&sorted, 0.25),
            p75: percentile(&sorted, 0.75),
        })
    }
}

/// Location and spread over every historical case, used as the fallback baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalStats {
    pub median: f64,
    pub spread: f64,
}

impl GlobalStats {
    /// Compute global statistics. Returns `None` for an empty sample.
    pub fn from_hours(hours: &[f64]) -> Option<Self> {
        if hours.is_empty() {
            return None;
        }
        let sorted = sorted(hours);
        let median = percentile(&sorted, 0.5);
        Some(Self {
            median,
            spread: mean_absolute_deviation(&sorted, median),
        })
    }
}

/// Per-client statistics plus the global fallback, built once and read-only afterwards.
///
/// Clients with too little history stay in the table with no statistics, so
/// they can still be listed. Lookups are exact and case-sensitive.
#[derive(Debug, Clone)]
pub struct ClientStatsTable {
    clients: HashMap<String, Option<ClientStats>>,
    global: GlobalStats,
    total_cases: usize,
}

impl ClientStatsTable {
    /// Group records by client and compute every statistic.
    ///
    /// Returns `None` when there are no records.
    pub fn build(records: &[HistoricalRecord]) -> Option<Self> {
        let all: Vec<f64> = records.iter().map(|r| r.hours).collect();
        let global = GlobalStats::from_hours(&all)?;

        let mut grouped: HashMap<&str, Vec<f64>> = HashMap::new();
        for record in records {
            grouped
                .entry(record.client.as_str())
                .or_default()
                .push(record.hours);
        }

        let clients = grouped
            .into_iter()
            .map(|(client, hours)| (client.to_string(), ClientStats::from_hours(&hours)))
            .collect();

        Some(Self {
            clients,
            global,
            total_cases: records.len(),
        })
    }

    /// Statistics for a client, `None` when unknown or below the case threshold.
    pub fn get(&self, client: &str) -> Option<&ClientStats> {
        self.clients.get(client).and_then(Option::as_ref)
    }

    /// Whether the client appears in the history at all.
    pub fn contains(&self, client: &str) -> bool {
        self.clients.contains_key(client)
    }

    /// Known clients, sorted.
    pub fn clients(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn global(&self) -> GlobalStats {
        self.global
    }

    /// Number of historical records the table was built from.
    pub fn total_cases(&self) -> usize {
        self.total_cases
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile by linear interpolation between closest ranks. `sorted` must be
/// non-empty and ascending.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn mean_absolute_deviation(values: &[f64], center: f64) -> f64 {
    values.iter().map(|v| (v - center).abs()).sum::<f64>() / values.len() as f64
}

//! Keyword extraction from bug summaries and descriptions.
//!
//! Two extractors live here:
//! - [`PayrollKeywords`]: a fixed set of word-boundary-aware regexes that
//!   produce [`PayrollSignals`].
//! - [`KeywordTable`]: a configurable list of keywords matched as plain
//!   case-insensitive substrings, with no word-boundary enforcement.
//!
//! The two deliberately match differently; the same text can trigger a
//! configured keyword without triggering the corresponding regex signal.

use std::collections::HashSet;

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde::Serialize;

/// Join summary and description the way every extractor sees them.
pub fn combined_text(summary: &str, description: &str) -> String {
    format!("{} {}", summary, description)
}

/// Number of whitespace-delimited tokens in the text.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Boolean signals for the fixed payroll vocabulary.
///
/// Signals are independent: the adjustment signal and the plain IRPF signal
/// may both fire for the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PayrollSignals {
    /// Income-tax withholding (IRPF) is mentioned.
    pub irpf: bool,
    /// An IRPF adjustment or correction is mentioned.
    pub irpf_adjustment: bool,
    /// Leave, permits or vacations.
    pub leave: bool,
    /// Payroll sheets or mass runs.
    pub mass_run: bool,
    /// Year-end bonus (aguinaldo).
    pub bonus: bool,
}

/// Regex extractor for [`PayrollSignals`].
#[derive(Debug)]
pub struct PayrollKeywords {
    irpf: Regex,
    irpf_adjustment: Regex,
    leave: Regex,
    mass_run: Regex,
    bonus: Regex,
}

impl PayrollKeywords {
    /// Create the extractor with the built-in patterns.
    pub fn new() -> Self {
        Self {
            irpf: Regex::new(r"\birpf\b").unwrap(),
            irpf_adjustment: Regex::new(r"ajuste.*irpf|correc.*irpf").unwrap(),
            leave: Regex::new(r"\blicenc|\bpermiso|\bvacaci").unwrap(),
            mass_run: Regex::new(r"\bplanilla|\bmasiv").unwrap(),
            bonus: Regex::new(r"\baguinaldo\b").unwrap(),
        }
    }

    /// Extract signals from free text. Matching is done on the lower-cased text.
    pub fn extract(&self, text: &str) -> PayrollSignals {
        let text = text.to_lowercase();
        PayrollSignals {
            irpf: self.irpf.is_match(&text),
            irpf_adjustment: self.irpf_adjustment.is_match(&text),
            leave: self.leave.is_match(&text),
            mass_run: self.mass_run.is_match(&text),
            bonus: self.bonus.is_match(&text),
        }
    }
}

impl Default for PayrollKeywords {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured keyword and the multiplier it applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub multiplier: f64,
}

/// Ordered keyword rules matched as case-insensitive substrings.
#[derive(Debug)]
pub struct KeywordTable {
    rules: Vec<KeywordRule>,
    /// Lower-cased keywords, index-aligned with `rules`.
    lowered: Vec<String>,
    matcher: AhoCorasick,
}

impl KeywordTable {
    /// Build the table. Rule order is kept and drives rationale order.
    pub fn new(rules: Vec<KeywordRule>) -> Result<Self, aho_corasick::BuildError> {
        let lowered: Vec<String> = rules.iter().map(|r| r.keyword.to_lowercase()).collect();
        let matcher = AhoCorasick::new(&lowered)?;
        Ok(Self {
            rules,
            lowered,
            matcher,
        })
    }

    /// Rules whose keyword occurs anywhere in the text, in table order.
    pub fn matches(&self, text: &str) -> Vec<&KeywordRule> {
        let text = text.to_lowercase();

        // Overlapping search so that keywords nested inside other keywords
        // ("recibo" inside "recibos") are all reported.
        let found: HashSet<&str> = self
            .matcher
            .find_overlapping_iter(&text)
            .map(|m| self.lowered[m.pattern().as_usize()].as_str())
            .collect();

        self.rules
            .iter()
            .zip(&self.lowered)
            .filter(|(_, keyword)| found.contains(keyword.as_str()))
            .map(|(rule, _)| rule)
            .collect()
    }

    /// All rules, in table order.
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

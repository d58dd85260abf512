//! Business-rule multipliers.
//!
//! A [`RuleChain`] keeps a running multiplier and one rationale line per
//! applied rule. Rules are applied in a fixed order; the order only changes
//! how the rationale reads, never the final multiplier.

use crate::estimation::keywords::{KeywordRule, PayrollSignals};

/// Client whose bugs historically take longer than the rest.
pub const SPECIAL_CLIENT: &str = "Intendencia de Rivera";

/// Above this many tokens the description counts as very long.
pub const VERY_LONG_TEXT_TOKENS: usize = 150;
/// Above this many tokens the description counts as long.
pub const LONG_TEXT_TOKENS: usize = 80;

/// Running multiplier plus the rationale for every applied rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleChain {
    multiplier: f64,
    factors: Vec<String>,
}

impl RuleChain {
    pub fn new() -> Self {
        Self {
            multiplier: 1.0,
            factors: Vec::new(),
        }
    }

    /// Multiply and record the rationale.
    pub fn apply(&mut self, multiplier: f64, factor: impl Into<String>) {
        let factor = factor.into();
        tracing::debug!("Rule applied: {} (x{})", factor, multiplier);
        self.multiplier *= multiplier;
        self.factors.push(factor);
    }

    /// Apply only when `triggered`.
    pub fn apply_if(&mut self, triggered: bool, multiplier: f64, factor: &str) {
        if triggered {
            self.apply(multiplier, factor);
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    pub fn into_parts(self) -> (f64, Vec<String>) {
        (self.multiplier, self.factors)
    }
}

impl Default for RuleChain {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixed payroll rule sequence.
///
/// The two combination rules are independent of each other and stack on top
/// of the single-signal rules.
pub fn payroll_rules(client: &str, signals: &PayrollSignals, tokens: usize) -> RuleChain {
    let mut chain = RuleChain::new();

    if client == SPECIAL_CLIENT {
        chain.apply(1.15, format!("Client {} (+15%)", SPECIAL_CLIENT));
    }

    chain.apply_if(signals.irpf, 1.25, "IRPF (+25%)");
    chain.apply_if(signals.irpf_adjustment, 1.35, "IRPF adjustment (+35%)");
    chain.apply_if(signals.leave, 1.15, "Leave (+15%)");
    chain.apply_if(signals.mass_run, 1.30, "Payroll sheets / mass run (+30%)");
    chain.apply_if(signals.bonus, 1.20, "Year-end bonus (+20%)");

    if tokens > VERY_LONG_TEXT_TOKENS {
        chain.apply(1.20, "Very long description (+20%)");
    } else if tokens > LONG_TEXT_TOKENS {
        chain.apply(1.10, "Long description (+10%)");
    }

    chain.apply_if(
        signals.irpf && signals.mass_run,
        1.25,
        "IRPF + mass run (+25% extra)",
    );
    chain.apply_if(
        signals.irpf_adjustment && signals.mass_run,
        1.40,
        "IRPF adjustment + mass run (+40% extra)",
    );

    chain
}

/// Apply matched configured keywords in table order.
pub fn keyword_rules<'a>(matched: impl IntoIterator<Item = &'a KeywordRule>) -> RuleChain {
    let mut chain = RuleChain::new();
    for rule in matched {
        chain.apply(rule.multiplier, keyword_label(rule));
    }
    chain
}

/// Display label for a configured keyword: underscores become spaces, the
/// name is title-cased, and the percentage delta is shown when non-zero.
pub fn keyword_label(rule: &KeywordRule) -> String {
    let name = title_case(&rule.keyword.replace('_', " "));
    let percent = ((rule.multiplier - 1.0) * 100.0).round_ties_even() as i64;
    if percent != 0 {
        format!("{} ({:+}%)", name, percent)
    } else {
        name
    }
}

/// Uppercase the first letter of every run of letters, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

use serde::Serialize;

use super::stats::{finite_values, percentile, stddev};
use super::types::{Band, YearlyPercentiles, period_growth};

#[derive(Debug, Clone, Copy)]
pub struct ExtendedStatsInput<'a> {
    pub initial_value: f64,
    pub years: u32,
    pub terminal_values: &'a [f64],
    pub yearly: &'a [YearlyPercentiles],
    pub annual_withdrawal: f64,
    pub tax_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryEquivalent {
    /// Pre-tax income needed to net the withdrawal.
    pub salary: f64,
    pub tax_savings: f64,
}

/// Return figures derived from one run. Each is `None` when its inputs are
/// degenerate; the others are still computed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedStatistics {
    pub cagr: Option<f64>,
    pub time_weighted_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub salary_equivalent: Option<SalaryEquivalent>,
}

pub fn compute_extended_statistics(input: ExtendedStatsInput<'_>) -> ExtendedStatistics {
    let median_terminal = percentile(&finite_values(input.terminal_values), 50.0).ok();

    ExtendedStatistics {
        cagr: median_terminal.and_then(|median| cagr(input.initial_value, median, input.years)),
        time_weighted_return: time_weighted_return(input.initial_value, input.yearly),
        annualized_volatility: annualized_volatility(
            input.initial_value,
            input.years,
            input.terminal_values,
        ),
        salary_equivalent: salary_equivalent(input.annual_withdrawal, input.tax_rate),
    }
}

/// Compound annual growth from `initial` to `terminal` over `years`.
///
/// A terminal value at or below zero reads as a total loss (-100%).
pub fn cagr(initial: f64, terminal: f64, years: u32) -> Option<f64> {
    let ratio = growth_ratio(initial, terminal)?;
    if years == 0 {
        return None;
    }
    Some(annualize(ratio, years as f64))
}

/// Population stddev of each draw's implied annualized return.
pub fn annualized_volatility(initial: f64, years: u32, terminal_values: &[f64]) -> Option<f64> {
    if years == 0 {
        return None;
    }
    let implied: Vec<f64> = terminal_values
        .iter()
        .filter_map(|&draw| growth_ratio(initial, draw))
        .map(|ratio| annualize(ratio, years as f64))
        .collect();
    stddev(&implied).ok()
}

/// Geometric mean of the chained period returns along the median path.
pub fn time_weighted_return(initial: f64, yearly: &[YearlyPercentiles]) -> Option<f64> {
    let factors = period_growth(initial, yearly, Band::P50)?;
    if factors.is_empty() {
        return None;
    }
    let chained: f64 = factors.iter().product();
    Some(annualize(chained, factors.len() as f64))
}

pub fn salary_equivalent(withdrawal: f64, tax_rate: f64) -> Option<SalaryEquivalent> {
    if !withdrawal.is_finite() || !(0.0..1.0).contains(&tax_rate) {
        return None;
    }
    let salary = withdrawal / (1.0 - tax_rate);
    Some(SalaryEquivalent {
        salary,
        tax_savings: salary - withdrawal,
    })
}

fn growth_ratio(initial: f64, terminal: f64) -> Option<f64> {
    if !initial.is_finite() || initial <= 0.0 || !terminal.is_finite() {
        return None;
    }
    Some((1.0 + (terminal - initial) / initial).max(0.0))
}

fn annualize(ratio: f64, years: f64) -> f64 {
    ratio.max(0.0).powf(1.0 / years) - 1.0
}

//! Loan-to-portfolio utilization bands.
//!
//! Loan balance and portfolio value are correlated across draws but not
//! co-monotonic, so dividing same-rank percentiles would pull every band
//! toward the centre. The bands here pair *opposing* percentiles instead:
//!
//! | band | numerator  | denominator     |
//! |------|------------|-----------------|
//! | p90  | p90 loan   | p10 portfolio   |
//! | p75  | p75 loan   | p25 portfolio   |
//! | p50  | p50 loan   | p50 portfolio   |
//! | p25  | p25 loan   | p75 portfolio   |
//! | p10  | p10 loan   | p90 portfolio   |
//!
//! This is a conservative heuristic bound on joint tail risk, not an exact
//! statistic of the utilization distribution. Callers presenting these
//! numbers should say so.

use std::collections::HashMap;

use serde::Serialize;

use super::types::{Band, YearlyPercentiles};

/// Reported for a year where the portfolio is gone but debt remains, in
/// place of an infinite ratio.
pub const SATURATED_UTILIZATION_PCT: f64 = 10_000.0;

/// Utilization in percent of portfolio value. Values are never negative and
/// have no upper clamp: above 100% means the loan exceeds the collateral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationBand {
    pub year: u32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl UtilizationBand {
    pub fn best_case(&self) -> f64 {
        self.p10
    }

    pub fn median_case(&self) -> f64 {
        self.p50
    }

    pub fn worst_case(&self) -> f64 {
        self.p90
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationSummary {
    pub peak_median: f64,
    pub peak_worst_case: f64,
    pub peak_worst_case_year: u32,
}

/// Heuristic utilization bands, one per year present in both series.
///
/// See the module docs: bands pair opposing percentiles and bound joint tail
/// risk conservatively rather than measuring it exactly.
pub fn estimate_utilization_bands(
    loan_balance: &[YearlyPercentiles],
    portfolio: &[YearlyPercentiles],
) -> Vec<UtilizationBand> {
    let portfolio_by_year: HashMap<u32, &YearlyPercentiles> =
        portfolio.iter().map(|y| (y.year, y)).collect();

    loan_balance
        .iter()
        .filter_map(|loan| {
            let value = portfolio_by_year.get(&loan.year)?;
            let band = |b: Band| utilization_pct(loan.at(b), value.at(b.opposite()));
            Some(UtilizationBand {
                year: loan.year,
                p10: band(Band::P10),
                p25: band(Band::P25),
                p50: band(Band::P50),
                p75: band(Band::P75),
                p90: band(Band::P90),
            })
        })
        .collect()
}

pub fn summarize_utilization(bands: &[UtilizationBand]) -> Option<UtilizationSummary> {
    let peak_median = bands.iter().map(|b| b.median_case()).fold(None, max_opt)?;
    let worst = bands
        .iter()
        .max_by(|a, b| a.worst_case().total_cmp(&b.worst_case()))?;
    Some(UtilizationSummary {
        peak_median,
        peak_worst_case: worst.worst_case(),
        peak_worst_case_year: worst.year,
    })
}

fn max_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

fn utilization_pct(loan: f64, portfolio: f64) -> f64 {
    let loan = if loan.is_finite() { loan.max(0.0) } else { 0.0 };
    if loan <= 0.0 {
        return 0.0;
    }
    if !portfolio.is_finite() || portfolio <= 0.0 {
        return SATURATED_UTILIZATION_PCT;
    }
    let pct = loan / portfolio * 100.0;
    if pct.is_finite() {
        pct.max(0.0)
    } else {
        SATURATED_UTILIZATION_PCT
    }
}

use serde::{Deserialize, Serialize};

/// One of the five percentile bands every yearly series carries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Band {
    P10,
    P25,
    P50,
    P75,
    P90,
}

impl Band {
    /// The band mirrored around the median (p10 <-> p90, p25 <-> p75).
    pub fn opposite(self) -> Band {
        match self {
            Band::P10 => Band::P90,
            Band::P25 => Band::P75,
            Band::P50 => Band::P50,
            Band::P75 => Band::P25,
            Band::P90 => Band::P10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPercentiles {
    pub year: u32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl YearlyPercentiles {
    pub fn at(&self, band: Band) -> f64 {
        match band {
            Band::P10 => self.p10,
            Band::P25 => self.p25,
            Band::P50 => self.p50,
            Band::P75 => self.p75,
            Band::P90 => self.p90,
        }
    }
}

/// Year-over-year growth factors of one band of a yearly series.
///
/// The path starts from `initial_value` unless the series opens with a
/// year-0 record, which then serves as the starting point. A step into or out
/// of a zero value has a factor of zero. Returns `None` when the starting
/// point is not positive.
pub fn period_growth(initial_value: f64, yearly: &[YearlyPercentiles], band: Band) -> Option<Vec<f64>> {
    let (start, rest) = match yearly.split_first() {
        Some((first, rest)) if first.year == 0 => (first.at(band), rest),
        _ => (initial_value, yearly),
    };
    if !start.is_finite() || start <= 0.0 {
        return None;
    }

    let mut prev = start;
    let factors = rest
        .iter()
        .map(|record| {
            let value = record.at(band);
            let factor = if prev > 0.0 && value.is_finite() {
                (value / prev).max(0.0)
            } else {
                0.0
            };
            prev = if value.is_finite() { value } else { 0.0 };
            factor
        })
        .collect();
    Some(factors)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStatistics {
    pub median: f64,
    pub mean: f64,
    #[serde(rename = "stddev")]
    pub std_dev: f64,
    /// Share of successful draws, 0 to 100.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoanTrajectory {
    pub balance: Vec<YearlyPercentiles>,
    pub cumulative_interest: Vec<YearlyPercentiles>,
    pub cumulative_withdrawals: Vec<YearlyPercentiles>,
}

impl LoanTrajectory {
    pub fn final_median_balance(&self) -> f64 {
        self.balance.last().map(|y| y.p50).unwrap_or(0.0)
    }

    pub fn final_median_interest(&self) -> f64 {
        self.cumulative_interest.last().map(|y| y.p50).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginCallYear {
    pub year: u32,
    /// Probability of a margin call in this year, 0 to 100.
    pub probability: f64,
    /// Probability of at least one margin call up to and including this year, 0 to 100.
    pub cumulative_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstateAnalysis {
    pub bbd_net_estate: f64,
    pub sell_net_estate: f64,
    pub bbd_advantage: f64,
}

/// A finished Monte Carlo run as handed over by the sampler.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationOutput {
    pub yearly_percentiles: Vec<YearlyPercentiles>,
    pub terminal_values: Vec<f64>,
    pub statistics: SimulationStatistics,
    pub loan_trajectory: Option<LoanTrajectory>,
    pub margin_call_stats: Option<Vec<MarginCallYear>>,
    pub estate_analysis: Option<EstateAnalysis>,
}

/// The parts of a run that only exist when borrowing is configured.
#[derive(Debug, Clone, Copy)]
pub struct LeveragedRun<'a> {
    pub loan: &'a LoanTrajectory,
    pub estate: &'a EstateAnalysis,
}

impl SimulationOutput {
    /// Borrow-vs-sell sections apply only when the run carries both a loan
    /// trajectory and an estate analysis.
    pub fn leverage(&self) -> Option<LeveragedRun<'_>> {
        match (&self.loan_trajectory, &self.estate_analysis) {
            (Some(loan), Some(estate)) => Some(LeveragedRun { loan, estate }),
            _ => None,
        }
    }

    /// Highest cumulative margin-call probability across the horizon.
    ///
    /// `None` when the run carries no margin-call stats at all.
    pub fn final_margin_call_probability(&self) -> Option<f64> {
        self.margin_call_stats.as_ref().map(|years| {
            years
                .iter()
                .map(|y| y.cumulative_probability)
                .filter(|p| p.is_finite())
                .fold(0.0_f64, f64::max)
                .clamp(0.0, 100.0)
        })
    }

    pub fn final_median_portfolio(&self) -> Option<f64> {
        self.yearly_percentiles.last().map(|y| y.p50)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditFacility {
    pub credit_limit: f64,
    pub interest_rate: f64,
    pub annual_withdrawal: f64,
    #[serde(default)]
    pub withdrawal_growth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxSettings {
    pub effective_income_tax_rate: f64,
    pub capital_gains_rate: f64,
    /// Share of any sale that is return of cost basis, 0 to 1.
    pub cost_basis_ratio: f64,
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self {
            effective_income_tax_rate: 0.37,
            capital_gains_rate: 0.238,
            cost_basis_ratio: 0.40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub initial_value: f64,
    pub time_horizon: u32,
    #[serde(default)]
    pub iterations: u32,
    #[serde(default)]
    pub credit_facility: Option<CreditFacility>,
    #[serde(default)]
    pub taxes: TaxSettings,
}

impl SimulationConfig {
    /// The facility, if it can actually lend.
    pub fn active_credit(&self) -> Option<&CreditFacility> {
        self.credit_facility
            .as_ref()
            .filter(|facility| facility.credit_limit > 0.0)
    }

    pub fn annual_withdrawal(&self) -> f64 {
        self.active_credit()
            .map(|facility| facility.annual_withdrawal.max(0.0))
            .unwrap_or(0.0)
    }

    pub fn withdrawal_growth(&self) -> f64 {
        self.active_credit()
            .map(|facility| facility.withdrawal_growth)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReturnSeries {
    pub symbol: String,
    pub name: String,
    /// Periodic (daily) simple returns, oldest first.
    pub returns: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
}

/// A run paired with the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRun {
    pub output: SimulationOutput,
    pub config: SimulationConfig,
}

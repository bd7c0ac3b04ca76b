//! Replays a "sell shares to fund spending" strategy over the primary run's
//! percentile paths so it can be benchmarked against borrowing.
//!
//! The primary run's yearly percentiles are reused as the price path; nothing
//! here is resampled. Each of the five bands is replayed as its own path and
//! stands for a slice of the outcome space: half-way to each neighbouring
//! band, so p10 covers the bottom 17.5%, p25 the next 20%, p50 the middle 25%.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use super::types::{Band, SimulationConfig, YearlyPercentiles, period_growth};

const OUTCOME_WEIGHTS: [(Band, f64); 5] = [
    (Band::P10, 17.5),
    (Band::P25, 20.0),
    (Band::P50, 25.0),
    (Band::P75, 20.0),
    (Band::P90, 17.5),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellStrategyInput {
    pub initial_value: f64,
    pub annual_withdrawal: f64,
    pub withdrawal_growth: f64,
    pub time_horizon: u32,
    pub capital_gains_rate: f64,
    /// Share of every sale that is return of basis, 0 to 1.
    pub cost_basis_ratio: f64,
}

impl SellStrategyInput {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            initial_value: config.initial_value,
            annual_withdrawal: config.annual_withdrawal(),
            withdrawal_growth: config.withdrawal_growth(),
            time_horizon: config.time_horizon,
            capital_gains_rate: config.taxes.capital_gains_rate,
            cost_basis_ratio: config.taxes.cost_basis_ratio,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SellRisk {
    Depletion,
    SequenceRisk,
    TaxDrag,
}

impl SellRisk {
    pub fn label(self) -> &'static str {
        match self {
            SellRisk::Depletion => "Depletion",
            SellRisk::SequenceRisk => "Sequence Risk",
            SellRisk::TaxDrag => "Tax Drag",
        }
    }
}

impl fmt::Display for SellRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for SellRisk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellYear {
    pub year: u32,
    pub value: f64,
    pub withdrawal: f64,
    pub taxes_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellStrategyOutcome {
    pub terminal_net_worth: f64,
    /// 0 to 100.
    pub success_rate: f64,
    pub lifetime_taxes: f64,
    pub terminal_p10: f64,
    pub terminal_p90: f64,
    pub yearly_values: Vec<SellYear>,
    /// 0 to 100.
    pub depletion_probability: f64,
    pub primary_risk: SellRisk,
}

#[derive(Debug, Clone)]
struct PathReplay {
    terminal: f64,
    taxes: f64,
    depleted: bool,
    years: Vec<SellYear>,
}

pub fn simulate_sell_strategy(
    input: &SellStrategyInput,
    yearly: &[YearlyPercentiles],
) -> SellStrategyOutcome {
    let replays =
        OUTCOME_WEIGHTS.map(|(band, weight)| (weight, replay_path(input, yearly, band)));
    let depletion_probability = replays
        .iter()
        .filter(|(_, replay)| replay.depleted)
        .map(|(weight, _)| weight)
        .sum::<f64>()
        .clamp(0.0, 100.0);
    let [(_, low), _, (_, median), _, (_, high)] = &replays;

    let primary_risk = if depletion_probability > 0.0 {
        SellRisk::Depletion
    } else if low.terminal < input.initial_value {
        SellRisk::SequenceRisk
    } else {
        SellRisk::TaxDrag
    };

    debug!(
        depletion_probability,
        median_terminal = median.terminal,
        lifetime_taxes = median.taxes,
        "sell strategy replayed"
    );

    SellStrategyOutcome {
        terminal_net_worth: median.terminal,
        success_rate: 100.0 - depletion_probability,
        lifetime_taxes: median.taxes,
        terminal_p10: low.terminal,
        terminal_p90: high.terminal,
        yearly_values: median.years.clone(),
        depletion_probability,
        primary_risk,
    }
}

fn replay_path(input: &SellStrategyInput, yearly: &[YearlyPercentiles], band: Band) -> PathReplay {
    let factors = period_growth(input.initial_value, yearly, band).unwrap_or_default();
    let horizon = (input.time_horizon as usize).min(factors.len());
    if horizon < input.time_horizon as usize {
        debug!(
            available = factors.len(),
            horizon = input.time_horizon,
            "yearly series shorter than horizon, replaying available years"
        );
    }

    let gain_share = (1.0 - input.cost_basis_ratio).clamp(0.0, 1.0);
    let rate = input.capital_gains_rate.max(0.0);
    let net_per_dollar_sold = 1.0 - gain_share * rate;

    let mut value = input.initial_value.max(0.0);
    let mut taxes = 0.0;
    let mut depleted = value <= 0.0;
    let mut years = Vec::with_capacity(horizon);

    for (idx, factor) in factors.iter().take(horizon).enumerate() {
        let year = idx as u32 + 1;
        if depleted {
            years.push(SellYear {
                year,
                value: 0.0,
                withdrawal: 0.0,
                taxes_paid: 0.0,
            });
            continue;
        }

        let growth = (1.0 + input.withdrawal_growth).max(0.0).powi(idx as i32);
        let withdrawal = input.annual_withdrawal.max(0.0) * growth;
        let gross_needed = if withdrawal <= 0.0 {
            0.0
        } else if net_per_dollar_sold > 0.0 {
            withdrawal / net_per_dollar_sold
        } else {
            f64::INFINITY
        };

        let sold = gross_needed.min(value);
        let tax = sold * gain_share * rate;
        taxes += tax;
        value -= sold;
        if sold + 1e-9 < gross_needed {
            depleted = true;
            value = 0.0;
        }

        value = (value * factor).max(0.0);
        if value <= 0.0 {
            depleted = true;
        }

        years.push(SellYear {
            year,
            value,
            withdrawal,
            taxes_paid: tax,
        });
    }

    PathReplay {
        terminal: value,
        taxes,
        depleted,
        years,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_input() -> SellStrategyInput {
        SellStrategyInput {
            initial_value: 1_000_000.0,
            annual_withdrawal: 50_000.0,
            withdrawal_growth: 0.0,
            time_horizon: 3,
            capital_gains_rate: 0.20,
            cost_basis_ratio: 0.50,
        }
    }

    /// Every band grows by its own constant yearly factor.
    fn fanned_series(years: u32, factors: [f64; 5]) -> Vec<YearlyPercentiles> {
        (1..=years)
            .map(|year| {
                let at = |f: f64| 1_000_000.0 * f.powi(year as i32);
                YearlyPercentiles {
                    year,
                    p10: at(factors[0]),
                    p25: at(factors[1]),
                    p50: at(factors[2]),
                    p75: at(factors[3]),
                    p90: at(factors[4]),
                }
            })
            .collect()
    }

    #[test]
    fn flat_market_taxes_only_the_gain_share() {
        let yearly = fanned_series(3, [1.0; 5]);
        let outcome = simulate_sell_strategy(&sample_input(), &yearly);

        // Net 50k needs a 50k / (1 - 0.5 * 0.2) = 55,555.56 sale each year.
        let gross = 50_000.0 / 0.9;
        assert_approx(outcome.lifetime_taxes, 3.0 * gross * 0.5 * 0.2);
        assert_approx(outcome.terminal_net_worth, 1_000_000.0 - 3.0 * gross);
        assert_eq!(outcome.yearly_values.len(), 3);
        assert_eq!(outcome.depletion_probability, 0.0);
        assert_eq!(outcome.success_rate, 100.0);
        assert_eq!(outcome.primary_risk, SellRisk::SequenceRisk);
    }

    #[test]
    fn withdrawals_grow_each_year() {
        let mut input = sample_input();
        input.withdrawal_growth = 0.10;
        input.capital_gains_rate = 0.0;
        let yearly = fanned_series(3, [1.0; 5]);
        let outcome = simulate_sell_strategy(&input, &yearly);

        let withdrawals: Vec<f64> = outcome.yearly_values.iter().map(|y| y.withdrawal).collect();
        assert_approx(withdrawals[0], 50_000.0);
        assert_approx(withdrawals[1], 55_000.0);
        assert_approx(withdrawals[2], 60_500.0);
        assert_approx(outcome.lifetime_taxes, 0.0);
    }

    #[test]
    fn weak_paths_deplete_and_drive_the_risk_label() {
        let mut input = sample_input();
        input.annual_withdrawal = 400_000.0;
        input.time_horizon = 4;
        let yearly = fanned_series(4, [0.8, 0.9, 1.0, 1.15, 1.3]);
        let outcome = simulate_sell_strategy(&input, &yearly);

        assert!(outcome.depletion_probability > 0.0);
        assert_approx(outcome.success_rate, 100.0 - outcome.depletion_probability);
        assert_eq!(outcome.primary_risk, SellRisk::Depletion);
        assert_eq!(outcome.primary_risk.to_string(), "Depletion");
        assert_approx(outcome.terminal_p10, 0.0);
        assert_eq!(outcome.yearly_values.len(), 4);
    }

    #[test]
    fn strong_market_without_losses_is_tax_drag() {
        let yearly = fanned_series(3, [1.10, 1.12, 1.15, 1.18, 1.20]);
        let outcome = simulate_sell_strategy(&sample_input(), &yearly);
        assert_eq!(outcome.primary_risk, SellRisk::TaxDrag);
        assert!(outcome.terminal_p10 <= outcome.terminal_net_worth);
        assert!(outcome.terminal_net_worth <= outcome.terminal_p90);
    }

    #[test]
    fn no_withdrawal_means_no_sales() {
        let mut input = sample_input();
        input.annual_withdrawal = 0.0;
        let yearly = fanned_series(3, [1.05; 5]);
        let outcome = simulate_sell_strategy(&input, &yearly);
        assert_approx(outcome.lifetime_taxes, 0.0);
        assert_approx(outcome.terminal_net_worth, 1_000_000.0 * 1.05f64.powi(3));
    }

    #[test]
    fn empty_series_keeps_initial_value() {
        let outcome = simulate_sell_strategy(&sample_input(), &[]);
        assert!(outcome.yearly_values.is_empty());
        assert_approx(outcome.terminal_net_worth, 1_000_000.0);
        assert_eq!(outcome.depletion_probability, 0.0);
    }

    #[test]
    fn risk_label_serializes_as_display_text() {
        let json = serde_json::to_string(&SellRisk::SequenceRisk).unwrap();
        assert_eq!(json, "\"Sequence Risk\"");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_lifetime_taxes_are_non_negative(
            withdrawal in 0.0f64..500_000.0,
            growth in -0.05f64..0.10,
            horizon in 1u32..30,
            cg_rate in 0.0f64..0.5,
            basis in 0.0f64..1.0,
            low in 0.7f64..1.0,
            high in 1.0f64..1.3
        ) {
            let input = SellStrategyInput {
                initial_value: 1_000_000.0,
                annual_withdrawal: withdrawal,
                withdrawal_growth: growth,
                time_horizon: horizon,
                capital_gains_rate: cg_rate,
                cost_basis_ratio: basis,
            };
            let mid = (low + high) / 2.0;
            let yearly = fanned_series(horizon, [low, (low + mid) / 2.0, mid, (mid + high) / 2.0, high]);
            let outcome = simulate_sell_strategy(&input, &yearly);

            prop_assert!(outcome.lifetime_taxes >= 0.0);
            prop_assert!(outcome.lifetime_taxes.is_finite());
            prop_assert!((0.0..=100.0).contains(&outcome.depletion_probability));
            prop_assert!((outcome.success_rate + outcome.depletion_probability - 100.0).abs() < 1e-9);
            prop_assert!(outcome.terminal_net_worth >= 0.0);
        }
    }
}

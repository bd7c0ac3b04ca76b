use serde::Serialize;
use tracing::warn;

use super::sell::SellStrategyOutcome;
use super::types::{LeveragedRun, SimulationOutput};

pub const LOW_RISK_LABEL: &str = "Low Risk";

#[derive(Debug, Clone, Copy)]
pub struct ComparatorInput<'a> {
    /// Median portfolio minus median loan balance at the horizon.
    pub bbd_terminal_net_worth: f64,
    /// 0 to 100.
    pub bbd_success_rate: f64,
    pub cumulative_interest: f64,
    /// Cumulative margin-call probability at the horizon, 0 to 100.
    pub margin_call_probability: f64,
    pub bbd_net_estate: f64,
    /// The sampler's own borrow-vs-sell estate gap, used as a sign check.
    pub sampler_advantage: Option<f64>,
    pub sell: &'a SellStrategyOutcome,
}

impl<'a> ComparatorInput<'a> {
    pub fn from_run(
        output: &SimulationOutput,
        leverage: LeveragedRun<'_>,
        sell: &'a SellStrategyOutcome,
    ) -> Self {
        let portfolio = output.final_median_portfolio().unwrap_or(0.0);
        Self {
            bbd_terminal_net_worth: portfolio - leverage.loan.final_median_balance(),
            bbd_success_rate: output.statistics.success_rate,
            cumulative_interest: leverage.loan.final_median_interest(),
            margin_call_probability: output.final_margin_call_probability().unwrap_or(0.0),
            bbd_net_estate: leverage.estate.bbd_net_estate,
            sampler_advantage: Some(leverage.estate.bbd_advantage),
            sell,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Bbd,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub recommendation: Recommendation,
    pub headline: String,
    pub rationale: String,
    /// The borrowing strategy's success rate, 0 to 100.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthDifferential {
    pub bbd_vs_sell: f64,
    pub tax_savings: f64,
    pub estate_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BbdSummary {
    pub terminal_net_worth: f64,
    pub success_rate: f64,
    pub primary_risk: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub advantage: f64,
    pub bbd_better: bool,
    /// `advantage` as a percentage of the losing strategy's terminal value;
    /// absent when that value is not positive.
    pub advantage_pct: Option<f64>,
    /// False when the sampler's own estate gap points the other way.
    pub sampler_sign_agrees: bool,
    pub verdict: Verdict,
    pub wealth_differential: WealthDifferential,
    pub bbd: BbdSummary,
    pub sell: SellStrategyOutcome,
    pub insights: Vec<String>,
}

pub fn compare_strategies(input: ComparatorInput<'_>) -> StrategyComparison {
    let sell = input.sell;
    let advantage = input.bbd_terminal_net_worth - sell.terminal_net_worth;
    let bbd_better = advantage > 0.0;

    let losing_value = if bbd_better {
        sell.terminal_net_worth
    } else {
        input.bbd_terminal_net_worth
    };
    let advantage_pct = (losing_value > 0.0 && advantage.is_finite())
        .then(|| advantage.abs() / losing_value * 100.0);

    let contradicts_sampler = input.sampler_advantage.is_some_and(|sampler| {
        sampler != 0.0 && advantage != 0.0 && sampler.signum() != advantage.signum()
    });
    if contradicts_sampler {
        warn!(
            engine_advantage = advantage,
            sampler_advantage = ?input.sampler_advantage,
            "borrow-vs-sell comparison disagrees in sign with the sampler's estate analysis"
        );
    }

    let wealth_differential = WealthDifferential {
        bbd_vs_sell: advantage,
        tax_savings: (sell.lifetime_taxes - input.cumulative_interest).max(0.0),
        estate_value: input.bbd_net_estate,
    };

    let primary_risk = bbd_risk_label(input.margin_call_probability);
    let verdict = build_verdict(advantage, advantage_pct, input.bbd_success_rate);
    let mut insights = build_insights(&input, &wealth_differential);
    if contradicts_sampler {
        insights.push(
            "The sampler's estate analysis favours the other strategy; treat this verdict with caution."
                .to_string(),
        );
    }

    StrategyComparison {
        advantage,
        bbd_better,
        advantage_pct,
        sampler_sign_agrees: !contradicts_sampler,
        verdict,
        wealth_differential,
        bbd: BbdSummary {
            terminal_net_worth: input.bbd_terminal_net_worth,
            success_rate: input.bbd_success_rate,
            primary_risk,
        },
        sell: sell.clone(),
        insights,
    }
}

pub fn bbd_risk_label(margin_call_probability: f64) -> String {
    if margin_call_probability > 0.0 {
        format!("Margin Call ({margin_call_probability:.1}%)")
    } else {
        LOW_RISK_LABEL.to_string()
    }
}

fn build_verdict(advantage: f64, advantage_pct: Option<f64>, confidence: f64) -> Verdict {
    let (recommendation, headline, rationale) = if advantage > 0.0 {
        let rationale = match advantage_pct {
            Some(pct) => format!(
                "Borrowing against the portfolio ends with {pct:.1}% more net worth than selling assets to fund the same withdrawals."
            ),
            None => "Selling assets exhausts the portfolio, while borrowing keeps a positive net worth at the horizon.".to_string(),
        };
        (
            Recommendation::Bbd,
            "Borrowing builds more wealth".to_string(),
            rationale,
        )
    } else if advantage < 0.0 {
        let rationale = match advantage_pct {
            Some(pct) => format!(
                "Selling assets ends with {pct:.1}% more net worth than borrowing, once loan interest and the outstanding balance are counted."
            ),
            None => "Borrowing leaves debt larger than the portfolio, while selling keeps a positive net worth at the horizon.".to_string(),
        };
        (
            Recommendation::Sell,
            "Selling assets comes out ahead".to_string(),
            rationale,
        )
    } else {
        (
            Recommendation::Sell,
            "Both strategies finish level".to_string(),
            "Borrowing and selling end with 0.0% difference in net worth, so the simpler sell strategy is preferred.".to_string(),
        )
    };

    Verdict {
        recommendation,
        headline,
        rationale,
        confidence: confidence.clamp(0.0, 100.0),
    }
}

fn build_insights(input: &ComparatorInput<'_>, wealth: &WealthDifferential) -> Vec<String> {
    let mut insights = Vec::new();

    if wealth.tax_savings > 0.0 {
        insights.push(
            "Capital gains taxes avoided by borrowing exceed the interest paid on the loan."
                .to_string(),
        );
    } else if input.sell.lifetime_taxes > 0.0 {
        insights.push(
            "Loan interest costs more than the capital gains taxes that selling would incur."
                .to_string(),
        );
    }

    if input.margin_call_probability > 0.0 {
        insights.push(format!(
            "A margin call occurs in {:.1}% of simulated paths before the horizon.",
            input.margin_call_probability
        ));
    }

    if input.sell.depletion_probability > 0.0 {
        insights.push(format!(
            "Selling depletes the portfolio in {:.1}% of the modeled outcomes.",
            input.sell.depletion_probability
        ));
    }

    if input.bbd_success_rate < input.sell.success_rate {
        insights.push(
            "Selling has a higher success rate than borrowing despite the tax cost.".to_string(),
        );
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sell::{SellRisk, SellStrategyOutcome};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sell_outcome(terminal: f64, taxes: f64) -> SellStrategyOutcome {
        SellStrategyOutcome {
            terminal_net_worth: terminal,
            success_rate: 95.0,
            lifetime_taxes: taxes,
            terminal_p10: terminal * 0.5,
            terminal_p90: terminal * 1.5,
            yearly_values: Vec::new(),
            depletion_probability: 5.0,
            primary_risk: SellRisk::Depletion,
        }
    }

    fn input(bbd: f64, sell: &SellStrategyOutcome) -> ComparatorInput<'_> {
        ComparatorInput {
            bbd_terminal_net_worth: bbd,
            bbd_success_rate: 92.0,
            cumulative_interest: 100_000.0,
            margin_call_probability: 0.0,
            bbd_net_estate: bbd * 0.9,
            sampler_advantage: None,
            sell,
        }
    }

    #[test]
    fn borrowing_ahead_recommends_bbd() {
        let sell = sell_outcome(2_000_000.0, 300_000.0);
        let report = compare_strategies(input(2_500_000.0, &sell));

        assert!(report.bbd_better);
        assert_approx(report.advantage, 500_000.0);
        assert_approx(report.advantage_pct.unwrap(), 25.0);
        assert_eq!(report.verdict.recommendation, Recommendation::Bbd);
        assert!(report.verdict.rationale.contains("25.0%"));
        assert_approx(report.verdict.confidence, 92.0);
        assert_approx(report.wealth_differential.bbd_vs_sell, 500_000.0);
        assert_approx(report.wealth_differential.tax_savings, 200_000.0);
        assert_approx(report.wealth_differential.estate_value, 2_250_000.0);
        assert_eq!(report.bbd.primary_risk, LOW_RISK_LABEL);
    }

    #[test]
    fn selling_ahead_measures_against_borrowing() {
        let sell = sell_outcome(2_000_000.0, 50_000.0);
        let report = compare_strategies(input(1_600_000.0, &sell));

        assert!(!report.bbd_better);
        assert_eq!(report.verdict.recommendation, Recommendation::Sell);
        assert_approx(report.advantage_pct.unwrap(), 25.0);
        assert!(report.verdict.rationale.contains("25.0%"));
        assert_eq!(report.wealth_differential.tax_savings, 0.0);
    }

    #[test]
    fn non_positive_losing_value_has_no_percentage() {
        let sell = sell_outcome(0.0, 10_000.0);
        let report = compare_strategies(input(500_000.0, &sell));
        assert!(report.advantage_pct.is_none());
        assert!(!report.verdict.rationale.contains("NaN"));
        assert!(!report.verdict.rationale.contains("inf"));
    }

    #[test]
    fn margin_call_probability_drives_risk_label() {
        assert_eq!(bbd_risk_label(12.34), "Margin Call (12.3%)");
        assert_eq!(bbd_risk_label(0.0), "Low Risk");

        let sell = sell_outcome(2_000_000.0, 0.0);
        let mut with_calls = input(2_100_000.0, &sell);
        with_calls.margin_call_probability = 7.5;
        let report = compare_strategies(with_calls);
        assert_eq!(report.bbd.primary_risk, "Margin Call (7.5%)");
        assert!(report.insights.iter().any(|i| i.contains("7.5%")));
    }

    #[test]
    fn sampler_sign_disagreement_is_reported() {
        let sell = sell_outcome(2_000_000.0, 300_000.0);
        let mut disputed = input(2_500_000.0, &sell);
        disputed.sampler_advantage = Some(-150_000.0);
        let report = compare_strategies(disputed);
        assert!(report.bbd_better);
        assert!(!report.sampler_sign_agrees);
        assert!(report.insights.iter().any(|i| i.contains("sampler")));

        let mut agreeing = input(2_500_000.0, &sell);
        agreeing.sampler_advantage = Some(150_000.0);
        let report = compare_strategies(agreeing);
        assert!(report.sampler_sign_agrees);
        assert!(!report.insights.iter().any(|i| i.contains("sampler")));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"samplerSignAgrees\":true"));
    }

    #[test]
    fn serializes_recommendation_in_lowercase() {
        let sell = sell_outcome(1.0, 0.0);
        let report = compare_strategies(input(2.0, &sell));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"recommendation\":\"bbd\""));
        assert!(json.contains("\"wealthDifferential\""));
        assert!(json.contains("\"bbdVsSell\""));
    }
}

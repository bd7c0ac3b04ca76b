use serde::Serialize;

use super::extended::cagr;
use super::stats::{finite_values, percentile};
use super::types::SimulationRun;

/// `current - previous` for each metric both runs can report.
///
/// Optional metrics stay `None` (and are left out of the JSON) unless both
/// runs carry the data behind them; a missing metric is not "no change".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDeltas {
    pub terminal_median: f64,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_p10: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cagr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_call_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_estate: Option<f64>,
}

pub fn compare_runs(previous: &SimulationRun, current: &SimulationRun) -> ComparisonDeltas {
    let both = |f: &dyn Fn(&SimulationRun) -> Option<f64>| Some(f(current)? - f(previous)?);

    ComparisonDeltas {
        terminal_median: current.output.statistics.median - previous.output.statistics.median,
        success_rate: current.output.statistics.success_rate
            - previous.output.statistics.success_rate,
        terminal_p10: both(&|run: &SimulationRun| percentile(&finite_values(&run.output.terminal_values), 10.0).ok()),
        cagr: both(&run_cagr),
        margin_call_probability: both(&|run: &SimulationRun| run.output.final_margin_call_probability()),
        net_estate: both(&|run: &SimulationRun| run.output.estate_analysis.map(|e| e.bbd_net_estate)),
    }
}

fn run_cagr(run: &SimulationRun) -> Option<f64> {
    run.output.estate_analysis?;
    cagr(
        run.config.initial_value,
        run.output.statistics.median,
        run.config.time_horizon,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        EstateAnalysis, MarginCallYear, SimulationConfig, SimulationOutput, SimulationStatistics,
        TaxSettings,
    };

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn run(median: f64, success_rate: f64) -> SimulationRun {
        SimulationRun {
            output: SimulationOutput {
                terminal_values: vec![median * 0.5, median, median * 1.5],
                statistics: SimulationStatistics {
                    median,
                    mean: median,
                    std_dev: 0.0,
                    success_rate,
                },
                ..SimulationOutput::default()
            },
            config: SimulationConfig {
                initial_value: 1_000_000.0,
                time_horizon: 10,
                iterations: 1_000,
                credit_facility: None,
                taxes: TaxSettings::default(),
            },
        }
    }

    fn estate(net: f64) -> EstateAnalysis {
        EstateAnalysis {
            bbd_net_estate: net,
            sell_net_estate: net * 0.8,
            bbd_advantage: net * 0.2,
        }
    }

    #[test]
    fn core_deltas_are_always_present() {
        let deltas = compare_runs(&run(2_000_000.0, 90.0), &run(2_500_000.0, 85.0));
        assert_approx(deltas.terminal_median, 500_000.0);
        assert_approx(deltas.success_rate, -5.0);
        assert_approx(deltas.terminal_p10.unwrap(), 250_000.0);
    }

    #[test]
    fn cagr_delta_is_absent_when_one_side_lacks_estate_analysis() {
        let previous = run(2_000_000.0, 90.0);
        let mut current = run(2_500_000.0, 92.0);
        current.output.estate_analysis = Some(estate(2_000_000.0));

        let deltas = compare_runs(&previous, &current);
        assert!(deltas.cagr.is_none());
        assert!(deltas.net_estate.is_none());

        let json = serde_json::to_string(&deltas).unwrap();
        assert!(!json.contains("cagr"));
        assert!(!json.contains("netEstate"));
    }

    #[test]
    fn cagr_delta_present_when_both_sides_have_estate_analysis() {
        let mut previous = run(2_000_000.0, 90.0);
        let mut current = run(2_500_000.0, 92.0);
        previous.output.estate_analysis = Some(estate(1_800_000.0));
        current.output.estate_analysis = Some(estate(2_100_000.0));

        let deltas = compare_runs(&previous, &current);
        let expected = 2.5f64.powf(0.1) - 2.0f64.powf(0.1);
        assert_approx(deltas.cagr.unwrap(), expected);
        assert_approx(deltas.net_estate.unwrap(), 300_000.0);
    }

    #[test]
    fn margin_call_delta_requires_both_sides() {
        let mut previous = run(1.0, 90.0);
        let mut current = run(1.0, 90.0);
        current.output.margin_call_stats = Some(vec![MarginCallYear {
            year: 1,
            probability: 4.0,
            cumulative_probability: 4.0,
        }]);
        assert!(compare_runs(&previous, &current).margin_call_probability.is_none());

        previous.output.margin_call_stats = Some(vec![MarginCallYear {
            year: 1,
            probability: 1.0,
            cumulative_probability: 1.0,
        }]);
        let deltas = compare_runs(&previous, &current);
        assert_approx(deltas.margin_call_probability.unwrap(), 3.0);
    }

    #[test]
    fn non_finite_draws_do_not_reach_p10_delta() {
        let previous = run(2_000_000.0, 90.0);
        let mut current = run(2_000_000.0, 90.0);
        current.output.terminal_values.extend([f64::NAN, f64::INFINITY]);
        let p10 = compare_runs(&previous, &current).terminal_p10.unwrap();
        assert!(p10.is_finite());
        assert_approx(p10, 0.0);
    }

    #[test]
    fn empty_terminal_sample_omits_p10_delta() {
        let previous = run(1.0, 90.0);
        let mut current = run(1.0, 90.0);
        current.output.terminal_values.clear();
        assert!(compare_runs(&previous, &current).terminal_p10.is_none());
    }
}

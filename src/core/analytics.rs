use serde::{Deserialize, Serialize};
use tracing::debug;

use super::assets::{AssetStatistics, portfolio_asset_statistics};
use super::comparison::{ComparatorInput, StrategyComparison, compare_strategies};
use super::distribution::{DEFAULT_BIN_COUNT, Histogram, bin_terminal_values};
use super::extended::{ExtendedStatistics, ExtendedStatsInput, compute_extended_statistics};
use super::sell::{SellStrategyInput, simulate_sell_strategy};
use super::stats::{SortedSample, finite_values};
use super::types::{AssetRef, HistoricalReturnSeries, SimulationConfig, SimulationOutput};
use super::utilization::{
    UtilizationBand, UtilizationSummary, estimate_utilization_bands, summarize_utilization,
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisOptions {
    pub bin_count: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileSpectrum {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

/// Every derived section for one run. Sections whose inputs the run lacks
/// are `None` and left out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub histogram: Histogram,
    pub extended: ExtendedStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectrum: Option<PercentileSpectrum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_comparison: Option<StrategyComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization: Option<Vec<UtilizationBand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization_summary: Option<UtilizationSummary>,
    pub assets: Vec<AssetStatistics>,
}

/// p10/p50/p90 of the finite draws, the same draws the histogram bins.
pub fn terminal_spectrum(terminal_values: &[f64]) -> Option<PercentileSpectrum> {
    let sorted = SortedSample::new(&finite_values(terminal_values)).ok()?;
    Some(PercentileSpectrum {
        p10: sorted.percentile(10.0).ok()?,
        p50: sorted.percentile(50.0).ok()?,
        p90: sorted.percentile(90.0).ok()?,
    })
}

pub fn derive_metrics(
    output: &SimulationOutput,
    config: &SimulationConfig,
    assets: &[AssetRef],
    history: &[HistoricalReturnSeries],
    options: AnalysisOptions,
) -> DerivedMetrics {
    debug!(
        draws = output.terminal_values.len(),
        years = output.yearly_percentiles.len(),
        leveraged = output.leverage().is_some(),
        assets = assets.len(),
        "deriving metrics"
    );

    let histogram = bin_terminal_values(&output.terminal_values, options.bin_count);
    let extended = compute_extended_statistics(ExtendedStatsInput {
        initial_value: config.initial_value,
        years: config.time_horizon,
        terminal_values: &output.terminal_values,
        yearly: &output.yearly_percentiles,
        annual_withdrawal: config.annual_withdrawal(),
        tax_rate: config.taxes.effective_income_tax_rate,
    });

    let (strategy_comparison, utilization) = match output.leverage() {
        Some(leverage) => {
            let sell = simulate_sell_strategy(
                &SellStrategyInput::from_config(config),
                &output.yearly_percentiles,
            );
            let comparison = compare_strategies(ComparatorInput::from_run(output, leverage, &sell));
            let bands =
                estimate_utilization_bands(&leverage.loan.balance, &output.yearly_percentiles);
            (Some(comparison), Some(bands))
        }
        None => (None, None),
    };
    let utilization_summary = utilization.as_deref().and_then(summarize_utilization);

    DerivedMetrics {
        histogram,
        extended,
        spectrum: terminal_spectrum(&output.terminal_values),
        strategy_comparison,
        utilization,
        utilization_summary,
        assets: portfolio_asset_statistics(assets, history),
    }
}

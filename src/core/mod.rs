mod analytics;
mod assets;
mod comparison;
mod delta;
mod distribution;
mod error;
mod extended;
mod sell;
mod stats;
mod types;
mod utilization;

pub use analytics::{
    AnalysisOptions, DerivedMetrics, PercentileSpectrum, derive_metrics, terminal_spectrum,
};
pub use assets::{AssetStatistics, asset_statistics, portfolio_asset_statistics};
pub use comparison::{
    ComparatorInput, Recommendation, StrategyComparison, Verdict, WealthDifferential,
    compare_strategies,
};
pub use delta::{ComparisonDeltas, compare_runs};
pub use distribution::{DEFAULT_BIN_COUNT, Histogram, HistogramBin, bin_terminal_values};
pub use error::{AnalyticsError, Result};
pub use extended::{
    ExtendedStatistics, ExtendedStatsInput, SalaryEquivalent, compute_extended_statistics,
};
pub use sell::{SellRisk, SellStrategyInput, SellStrategyOutcome, SellYear, simulate_sell_strategy};
pub use stats::{SortedSample, mean, percentile, stddev};
pub use types::{
    AssetRef, CreditFacility, EstateAnalysis, HistoricalReturnSeries, LoanTrajectory,
    MarginCallYear, SimulationConfig, SimulationOutput, SimulationRun, SimulationStatistics,
    TaxSettings, YearlyPercentiles,
};
pub use utilization::{
    UtilizationBand, UtilizationSummary, estimate_utilization_bands, summarize_utilization,
};

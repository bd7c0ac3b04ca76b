use std::collections::HashMap;

use serde::Serialize;

use super::stats::{mean, stddev};
use super::types::{AssetRef, HistoricalReturnSeries};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const FALLBACK_EXPECTED_RETURN: f64 = 0.08;
pub const FALLBACK_VOLATILITY: f64 = 0.16;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetStatistics {
    pub symbol: String,
    pub name: String,
    pub expected_return: f64,
    pub volatility: f64,
    /// Placeholder figures rather than measured history.
    pub is_estimate: bool,
    pub observations: usize,
}

/// Annualizes a daily return series, or falls back to placeholder figures
/// when the symbol has no history.
pub fn asset_statistics(
    symbol: &str,
    name: &str,
    series: Option<&HistoricalReturnSeries>,
) -> AssetStatistics {
    let measured = series.and_then(|s| {
        let daily_mean = mean(&s.returns).ok()?;
        let daily_sd = stddev(&s.returns).ok()?;
        let expected_return = (1.0 + daily_mean).powf(TRADING_DAYS_PER_YEAR) - 1.0;
        let volatility = daily_sd * TRADING_DAYS_PER_YEAR.sqrt();
        (expected_return.is_finite() && volatility.is_finite())
            .then_some((expected_return, volatility, s.returns.len()))
    });

    match measured {
        Some((expected_return, volatility, observations)) => AssetStatistics {
            symbol: symbol.to_string(),
            name: name.to_string(),
            expected_return,
            volatility,
            is_estimate: false,
            observations,
        },
        None => AssetStatistics {
            symbol: symbol.to_string(),
            name: name.to_string(),
            expected_return: FALLBACK_EXPECTED_RETURN,
            volatility: FALLBACK_VOLATILITY,
            is_estimate: true,
            observations: 0,
        },
    }
}

/// Statistics for each asset in display order, matched to history by symbol.
///
/// An asset with an empty name borrows the series' display name.
pub fn portfolio_asset_statistics(
    assets: &[AssetRef],
    history: &[HistoricalReturnSeries],
) -> Vec<AssetStatistics> {
    let by_symbol: HashMap<&str, &HistoricalReturnSeries> =
        history.iter().map(|s| (s.symbol.as_str(), s)).collect();

    assets
        .iter()
        .map(|asset| {
            let series = by_symbol.get(asset.symbol.as_str()).copied();
            let name = match (asset.name.is_empty(), series) {
                (true, Some(s)) => s.name.as_str(),
                _ => asset.name.as_str(),
            };
            asset_statistics(&asset.symbol, name, series)
        })
        .collect()
}

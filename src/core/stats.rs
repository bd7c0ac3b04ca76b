//! Order statistics and moments shared by every analytics component.

use super::error::{AnalyticsError, Result};

/// Value at rank `p` (0 to 100) using linear interpolation between the two
/// nearest order statistics.
pub fn percentile(sample: &[f64], p: f64) -> Result<f64> {
    SortedSample::new(sample)?.percentile(p)
}

/// The finite draws of a sample, in their original order.
pub fn finite_values(sample: &[f64]) -> Vec<f64> {
    sample.iter().copied().filter(|v| v.is_finite()).collect()
}

pub fn mean(sample: &[f64]) -> Result<f64> {
    if sample.is_empty() {
        return Err(AnalyticsError::EmptyInput { what: "mean" });
    }
    Ok(sample.iter().sum::<f64>() / sample.len() as f64)
}

/// Population standard deviation (divides by N).
pub fn stddev(sample: &[f64]) -> Result<f64> {
    if sample.is_empty() {
        return Err(AnalyticsError::EmptyInput { what: "stddev" });
    }
    if sample.len() == 1 {
        return Ok(0.0);
    }

    let mu = mean(sample)?;
    let variance = sample
        .iter()
        .map(|v| {
            let d = v - mu;
            d * d
        })
        .sum::<f64>()
        / sample.len() as f64;
    Ok(variance.max(0.0).sqrt())
}

/// A sample sorted once so repeated percentile queries stay cheap.
#[derive(Debug, Clone)]
pub struct SortedSample {
    values: Vec<f64>,
}

impl SortedSample {
    pub fn new(sample: &[f64]) -> Result<Self> {
        if sample.is_empty() {
            return Err(AnalyticsError::EmptyInput { what: "percentile" });
        }
        let mut values = sample.to_vec();
        values.sort_by(|a, b| a.total_cmp(b));
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn percentile(&self, p: f64) -> Result<f64> {
        if !p.is_finite() || !(0.0..=100.0).contains(&p) {
            return Err(AnalyticsError::InvalidPercentile(p));
        }

        let n = self.values.len();
        if n == 1 {
            return Ok(self.values[0]);
        }

        let rank = (p / 100.0) * (n as f64 - 1.0);
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;

        if lower == upper {
            Ok(self.values[lower])
        } else {
            let w = rank - lower as f64;
            Ok(self.values[lower] * (1.0 - w) + self.values[upper] * w)
        }
    }
}

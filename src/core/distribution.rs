use serde::Serialize;
use tracing::warn;

use super::stats::finite_values;

pub const DEFAULT_BIN_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub bin_width: f64,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Bins terminal values for display.
///
/// An empty sample yields no bins and a zero width. A sample whose draws are
/// all identical yields a single `[v, v + 1]` bin. Non-finite draws are
/// dropped, so counts sum to the number of finite draws.
pub fn bin_terminal_values(sample: &[f64], bin_count: usize) -> Histogram {
    let bin_count = bin_count.max(1);
    let finite = finite_values(sample);
    if finite.len() < sample.len() {
        warn!(
            dropped = sample.len() - finite.len(),
            "dropping non-finite terminal values before binning"
        );
    }

    if finite.is_empty() {
        return Histogram::default();
    }

    let (min, max) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if max <= min {
        return Histogram {
            bins: vec![HistogramBin {
                min,
                max: min + 1.0,
                count: finite.len(),
            }],
            bin_width: 1.0,
        };
    }

    // Scaled before subtracting so spans near f64::MAX stay finite.
    let width = max / bin_count as f64 - min / bin_count as f64;
    if !width.is_finite() {
        return Histogram {
            bins: vec![HistogramBin {
                min,
                max,
                count: finite.len(),
            }],
            bin_width: f64::MAX,
        };
    }

    let mut counts = vec![0usize; bin_count];
    for v in &finite {
        let index = (v / width - min / width).floor().max(0.0) as usize;
        counts[index.min(bin_count - 1)] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            min: min + i as f64 * width,
            max: if i + 1 == bin_count {
                max
            } else {
                min + (i + 1) as f64 * width
            },
            count,
        })
        .collect();

    Histogram {
        bins,
        bin_width: width,
    }
}

use thiserror::Error;

/// Failures the analytics engine reports loudly.
///
/// Missing optional inputs and degenerate numbers are not errors; they are
/// handled by omitting a section or by a per-component fallback. These
/// variants mean a caller skipped a guard it should have had.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("cannot compute {what} of an empty sample")]
    EmptyInput { what: &'static str },

    #[error("percentile rank {0} is outside [0, 100]")]
    InvalidPercentile(f64),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

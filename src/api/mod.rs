use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    AnalysisOptions, AssetRef, ComparisonDeltas, DerivedMetrics, HistoricalReturnSeries,
    SimulationConfig, SimulationOutput, SimulationRun, compare_runs, derive_metrics,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid parameter: {field} - {message}")]
    Validation { field: String, message: String },
}

impl ApiError {
    fn invalid(field: &str, message: &str) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidPayload(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidPayload(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self, "rejecting request");
        error_response(self.status(), &self.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPayload {
    pub output: SimulationOutput,
    pub config: SimulationConfig,
    #[serde(default)]
    pub assets: Vec<AssetRef>,
    #[serde(default)]
    pub historical_returns: Vec<HistoricalReturnSeries>,
    #[serde(default)]
    pub bin_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparePayload {
    pub previous: SimulationRun,
    pub current: SimulationRun,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Rejects configurations no sampler run could have produced.
pub fn validate_config(config: &SimulationConfig) -> ApiResult<()> {
    if !config.initial_value.is_finite() || config.initial_value <= 0.0 {
        return Err(ApiError::invalid("initialValue", "must be > 0"));
    }

    if config.time_horizon == 0 {
        return Err(ApiError::invalid("timeHorizon", "must be > 0"));
    }

    let taxes = &config.taxes;
    for (field, rate) in [
        ("taxes.effectiveIncomeTaxRate", taxes.effective_income_tax_rate),
        ("taxes.capitalGainsRate", taxes.capital_gains_rate),
    ] {
        if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
            return Err(ApiError::invalid(field, "must be >= 0 and < 1"));
        }
    }

    if !(0.0..=1.0).contains(&taxes.cost_basis_ratio) {
        return Err(ApiError::invalid(
            "taxes.costBasisRatio",
            "must be between 0 and 1",
        ));
    }

    if let Some(facility) = &config.credit_facility {
        if !facility.credit_limit.is_finite() || facility.credit_limit < 0.0 {
            return Err(ApiError::invalid("creditFacility.creditLimit", "must be >= 0"));
        }
        if !facility.annual_withdrawal.is_finite() || facility.annual_withdrawal < 0.0 {
            return Err(ApiError::invalid(
                "creditFacility.annualWithdrawal",
                "must be >= 0",
            ));
        }
        if !facility.interest_rate.is_finite() || facility.interest_rate < 0.0 {
            return Err(ApiError::invalid("creditFacility.interestRate", "must be >= 0"));
        }
        if !facility.withdrawal_growth.is_finite() || facility.withdrawal_growth <= -1.0 {
            return Err(ApiError::invalid(
                "creditFacility.withdrawalGrowth",
                "must be > -1",
            ));
        }
    }

    Ok(())
}

fn options_from_payload(bin_count: Option<usize>) -> ApiResult<AnalysisOptions> {
    match bin_count {
        Some(0) => Err(ApiError::invalid("binCount", "must be > 0")),
        Some(bin_count) => Ok(AnalysisOptions { bin_count }),
        None => Ok(AnalysisOptions::default()),
    }
}

pub fn analyze_payload(payload: &AnalyticsPayload) -> ApiResult<DerivedMetrics> {
    validate_config(&payload.config)?;
    let options = options_from_payload(payload.bin_count)?;
    Ok(derive_metrics(
        &payload.output,
        &payload.config,
        &payload.assets,
        &payload.historical_returns,
        options,
    ))
}

pub fn analyze_payload_from_json(json: &str) -> ApiResult<DerivedMetrics> {
    let payload = serde_json::from_str::<AnalyticsPayload>(json)?;
    analyze_payload(&payload)
}

pub fn compare_payload(payload: &ComparePayload) -> ApiResult<ComparisonDeltas> {
    validate_config(&payload.previous.config)?;
    validate_config(&payload.current.config)?;
    Ok(compare_runs(&payload.previous, &payload.current))
}

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/analytics", post(analytics_handler))
        .route("/api/compare", post(compare_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "BBD analytics HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn analytics_handler(
    payload: Result<Json<AnalyticsPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;
    debug!(
        draws = payload.output.terminal_values.len(),
        assets = payload.assets.len(),
        "analytics request"
    );
    let metrics = analyze_payload(&payload)?;
    Ok(json_response(StatusCode::OK, metrics))
}

async fn compare_handler(
    payload: Result<Json<ComparePayload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;
    debug!("compare request");
    let deltas = compare_payload(&payload)?;
    Ok(json_response(StatusCode::OK, deltas))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::bs::OptionSide;
use crate::models::surface::{ImpliedVolatilityPoint, VolatilitySurface};

/// A traded option contract and its last observed price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub strike: f64,
    /// Calendar days from the valuation date to expiry
    pub expiry_days_from_now: i64,
    /// Last traded price
    pub market_price: f64,
    pub side: OptionSide,
}

impl OptionQuote {
    /// Time to maturity in years (ACT/365).
    pub fn years_to_expiry(&self) -> f64 {
        self.expiry_days_from_now as f64 / DAYS_PER_YEAR
    }
}

/// Day count used to convert days to expiry into years.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Per-reason counts from one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub quotes_seen: usize,
    /// market price <= 0 or not finite
    pub rejected_price: usize,
    /// expiry not strictly in the future
    pub rejected_expiry: usize,
    /// side not selected in the configuration
    pub skipped_side: usize,
    /// solver hit a domain error or the iteration cap
    pub unconverged: usize,
    /// converged above the configured volatility ceiling
    pub out_of_bounds: usize,
    pub points: usize,
}

/// Implied volatility points produced from a set of quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub points: Vec<ImpliedVolatilityPoint>,
    pub summary: AggregationSummary,
}

/// What a pipeline run used and produced, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub ticker: String,
    pub valuation_date: NaiveDate,
    pub spot: f64,
    pub expirations_used: Vec<NaiveDate>,
    pub aggregation: AggregationSummary,
}

/// Surface plus the report describing how it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub surface: VolatilitySurface,
    pub points: Vec<ImpliedVolatilityPoint>,
    pub report: PipelineReport,
}

//! Error types shared by the pricing, solving and surface-building layers.
//!
//! Per-quote numerical failures ([`DomainError`], non-convergence) are expected at the
//! tails of an option chain and are absorbed by the aggregator. Pipeline-level failures
//! ([`SurfaceError::InsufficientData`], [`SurfaceError::DataFetch`]) are always returned
//! to the caller.

use thiserror::Error;

/// Convenience alias for results produced by this crate's core.
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Pricing inputs that fall outside the mathematically valid domain of the
/// lognormal pricing formula.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DomainError {
    #[error("spot price must be positive and finite, got {0}")]
    Spot(f64),

    #[error("strike price must be positive and finite, got {0}")]
    Strike(f64),

    #[error("time to maturity must be positive and finite, got {0}")]
    TimeToMaturity(f64),

    #[error("volatility must be positive and finite, got {0}")]
    Volatility(f64),

    #[error("risk-free rate must be finite, got {0}")]
    Rate(f64),
}

/// Errors surfaced by the volatility surface pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SurfaceError {
    /// Pricing inputs were invalid.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Newton iteration hit its cap without meeting the price tolerance.
    #[error("implied volatility did not converge after {iterations} iterations (last estimate {last_volatility})")]
    ConvergenceFailure {
        iterations: usize,
        last_volatility: f64,
    },

    /// Too few usable implied-volatility points to build a surface.
    #[error("insufficient data: {message}")]
    InsufficientData { message: String },

    /// The market-data collaborator failed or returned malformed data.
    #[error("market data fetch failed: {message}")]
    DataFetch { message: String },

    /// A configuration value is unusable (grid size, rate, bounds).
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl SurfaceError {
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: msg.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: msg.into(),
        }
    }

    /// Wraps a provider error, keeping its full context chain in the message.
    pub fn data_fetch(err: &anyhow::Error) -> Self {
        Self::DataFetch {
            message: format!("{err:#}"),
        }
    }
}

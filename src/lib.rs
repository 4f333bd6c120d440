//! # IvSurface-Lib: Implied Volatility Extraction and Surface Interpolation
//!
//! `ivsurface-lib` turns listed option prices into a gridded implied volatility surface.
//! Each quote is inverted through Black-Scholes with a Newton-Raphson solver, and the
//! resulting scattered (strike, days-to-expiry, volatility) points are interpolated with a
//! Clough-Tocher cubic over their Delaunay triangulation.
//!
//! ## Core Features
//!
//! - **Black-Scholes**: European call/put price and vega with explicit domain checks
//! - **Implied Volatility**: Newton-Raphson inversion with a vega-collapse fallback step
//! - **Quote Aggregation**: price, expiry and side filters with per-reason counts
//! - **Surface Interpolation**: C1 piecewise-cubic gridding, undefined outside the data hull
//! - **Market Data**: provider trait with in-memory and CSV implementations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ivsurface_lib::{build_surface_for_ticker, default_configs, CsvChainProvider};
//!
//! let provider = CsvChainProvider::from_paths("chains.csv", "spots.csv")?;
//! let config = default_configs::fast("AAPL");
//!
//! let output = build_surface_for_ticker(&provider, &config)?;
//! println!(
//!     "{} of {} quotes solved, {} grid cells defined",
//!     output.report.aggregation.points,
//!     output.report.aggregation.quotes_seen,
//!     output.surface.defined_count()
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//!
//! The library emits `tracing` events (`info` per surface, `debug` per dropped quote,
//! `trace` per solve) and never installs a subscriber.
//!
//! ## Configuration Presets
//!
//! The library provides several pipeline configuration presets:
//! - `production()`: 50x50 grid, standard solver tolerance
//! - `fast()`: 25x25 grid, shorter solver budget
//! - `research()`: 100x100 grid, both sides, tighter tolerance, 90-day horizon
//! - `minimal()`: 10x10 grid for smoke tests

// ================================================================================================
// MODULES
// ================================================================================================

pub mod error;
pub mod market_data;
pub mod models;
pub mod pipeline;
pub mod render;

// ================================================================================================
// IMPORTS
// ================================================================================================

use std::path::Path;

use anyhow::{Context, Result};

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Errors
pub use error::{DomainError, SurfaceError};

// Pricing and implied volatility
pub use models::bs::{price, price_and_vega, OptionSide, PricingParameters, PricingResult};
pub use models::implied::{
    solve_implied_vol, solve_implied_vol_with_config, IvInputs, IvSolution, NonConvergence,
    SolverConfig,
};

// Surface interpolation
pub use models::surface::{
    build_surface, CloughTocher2d, ImpliedVolatilityPoint, SurfaceConfig, Triangulation,
    VolatilitySurface,
};

// Market data and pipeline
pub use market_data::{ChainQuote, CsvChainProvider, MarketDataProvider, StaticMarketData};
pub use pipeline::{
    aggregate_quotes, build_surface_for_ticker, surface_from_quotes, AggregationSummary,
    AggregatorConfig, OptionQuote, PipelineConfig, PipelineOutput, PipelineReport,
};

// Rendering
pub use render::{render_surface_svg, render_surface_with_samples};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured pipeline settings for common use cases.
///
/// # Available Configurations
///
/// - [`production()`]: Full-resolution surface
/// - [`fast()`]: Development-optimized settings
/// - [`research()`]: Wide, dense and precise
/// - [`minimal()`]: Quick validation settings
pub mod default_configs {
    use crate::pipeline::PipelineConfig;

    /// Full-resolution configuration.
    ///
    /// **Characteristics:**
    /// - 50 x 50 strike/maturity grid
    /// - Solver: 100 iterations, price tolerance 1e-5
    /// - Calls only, 30-day horizon
    ///
    /// # Example
    ///
    /// ```rust
    /// use ivsurface_lib::default_configs;
    ///
    /// let config = default_configs::production("AAPL");
    /// assert_eq!(config.surface.strike_points, 50);
    /// ```
    pub fn production(ticker: &str) -> PipelineConfig {
        PipelineConfig::production(ticker)
    }

    /// Fast configuration for development and dashboards.
    ///
    /// **Characteristics:**
    /// - 25 x 25 grid
    /// - Solver: 50 iterations
    pub fn fast(ticker: &str) -> PipelineConfig {
        PipelineConfig::fast(ticker)
    }

    /// High-resolution configuration for research.
    ///
    /// **Characteristics:**
    /// - 100 x 100 grid
    /// - Calls and puts, 90-day horizon
    /// - Solver: 200 iterations, price tolerance 1e-8
    ///
    /// **Use Cases:**
    /// - Comparing call and put implied volatilities
    /// - Studying term structure beyond the front month
    pub fn research(ticker: &str) -> PipelineConfig {
        PipelineConfig::research(ticker)
    }

    /// Minimal configuration for smoke tests.
    pub fn minimal(ticker: &str) -> PipelineConfig {
        PipelineConfig::minimal(ticker)
    }
}

/// Implied volatility of a single quote, or `None` when the solver does not converge.
///
/// `days_to_expiry` is converted to years on an ACT/365 basis.
///
/// # Example
///
/// ```rust
/// use ivsurface_lib::{implied_volatility, OptionSide};
///
/// let vol = implied_volatility(6.583084, 100.0, 100.0, 91.25, 0.05, OptionSide::Call);
/// assert!((vol.unwrap() - 0.30).abs() < 1e-4);
/// ```
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    days_to_expiry: f64,
    risk_free_rate: f64,
    side: OptionSide,
) -> Option<f64> {
    solve_implied_vol(&IvInputs {
        market_price,
        spot,
        strike,
        time_to_maturity: days_to_expiry / pipeline::DAYS_PER_YEAR,
        risk_free_rate,
        side,
    })
    .volatility()
}

/// Loads chain and spot CSV files and a TOML configuration, then builds the surface.
///
/// # Errors
///
/// An unreadable or malformed configuration file, a [`SurfaceError::DataFetch`] for
/// unreadable or malformed CSV input, and every [`SurfaceError`] the pipeline can return
/// with the ticker attached as context.
pub fn surface_from_files(
    chain_csv: impl AsRef<Path>,
    spot_csv: impl AsRef<Path>,
    config_toml: impl AsRef<Path>,
) -> Result<PipelineOutput> {
    let config = PipelineConfig::from_toml_file(config_toml)?;
    let provider =
        CsvChainProvider::from_paths(chain_csv, spot_csv).map_err(|e| SurfaceError::data_fetch(&e))?;
    build_surface_for_ticker(&provider, &config)
        .with_context(|| format!("building surface for {}", config.ticker))
}

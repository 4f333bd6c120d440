//! End-to-end surface construction: market data in, gridded volatility out.
//!
//! The runner lists expirations inside the configured horizon, turns each chain into
//! [`OptionQuote`]s dated against the valuation date, solves implied volatilities and
//! interpolates them. Every step is synchronous; nothing is cached between calls.

pub mod aggregator;
pub mod config;
pub mod types;

pub use aggregator::aggregate_quotes;
pub use config::{AggregatorConfig, PipelineConfig};
pub use types::*;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::{Result, SurfaceError};
use crate::market_data::MarketDataProvider;
use crate::models::surface::{build_surface, SurfaceConfig, VolatilitySurface};

/// Aggregates quotes and grids the resulting points.
///
/// Fails with [`SurfaceError::InsufficientData`] when no quote yields a usable
/// volatility, or when the surviving points cannot be triangulated.
pub fn surface_from_quotes(
    quotes: &[OptionQuote],
    spot: f64,
    aggregator: &AggregatorConfig,
    surface: &SurfaceConfig,
) -> Result<(VolatilitySurface, Aggregation)> {
    aggregator.validate()?;
    let aggregation = aggregate_quotes(quotes, spot, aggregator);
    if aggregation.points.is_empty() {
        return Err(SurfaceError::insufficient_data(format!(
            "no implied volatilities from {} quotes ({} bad price, {} expired, {} unconverged)",
            aggregation.summary.quotes_seen,
            aggregation.summary.rejected_price,
            aggregation.summary.rejected_expiry,
            aggregation.summary.unconverged,
        )));
    }
    let grid = build_surface(&aggregation.points, surface)?;
    Ok((grid, aggregation))
}

/// Quotes for every expiration with `0 < days <= max_days` from `valuation_date`.
///
/// Returns the quotes and the expirations they came from, ascending.
pub fn collect_quotes<P: MarketDataProvider + ?Sized>(
    provider: &P,
    ticker: &str,
    valuation_date: NaiveDate,
    max_days: i64,
) -> Result<(Vec<OptionQuote>, Vec<NaiveDate>)> {
    let mut expirations = provider
        .list_expirations(ticker)
        .map_err(|e| SurfaceError::data_fetch(&e))?;
    expirations.sort_unstable();
    expirations.dedup();
    expirations.retain(|exp| {
        let days = (*exp - valuation_date).num_days();
        days > 0 && days <= max_days
    });
    debug!(ticker, count = expirations.len(), max_days, "expirations in horizon");

    let mut quotes = Vec::new();
    for &expiration in &expirations {
        let days = (expiration - valuation_date).num_days();
        let chain = provider
            .fetch_option_chain(ticker, expiration)
            .map_err(|e| SurfaceError::data_fetch(&e))?;
        quotes.extend(chain.into_iter().map(|q| OptionQuote {
            strike: q.strike,
            expiry_days_from_now: days,
            market_price: q.last_price,
            side: q.side,
        }));
    }
    Ok((quotes, expirations))
}

/// Builds the implied volatility surface for `config.ticker`.
///
/// # Errors
///
/// * [`SurfaceError::InvalidConfig`] if the configuration does not validate
/// * [`SurfaceError::DataFetch`] if the provider fails or returns an unusable spot
/// * [`SurfaceError::InsufficientData`] if too few quotes survive to interpolate
pub fn build_surface_for_ticker<P: MarketDataProvider + ?Sized>(
    provider: &P,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    let ticker = config.ticker.as_str();
    let valuation_date = config
        .valuation_date
        .unwrap_or_else(|| Local::now().date_naive());

    let (quotes, expirations_used) =
        collect_quotes(provider, ticker, valuation_date, config.max_days)?;
    if expirations_used.is_empty() {
        warn!(ticker, max_days = config.max_days, "no expirations inside horizon");
    }

    let spot = provider
        .fetch_spot_price(ticker)
        .map_err(|e| SurfaceError::data_fetch(&e))?;
    if !(spot > 0.0 && spot.is_finite()) {
        return Err(SurfaceError::DataFetch {
            message: format!("spot price for {ticker} must be positive, got {spot}"),
        });
    }

    let (surface, aggregation) =
        surface_from_quotes(&quotes, spot, &config.aggregator(), &config.surface)?;

    info!(
        ticker,
        %valuation_date,
        spot,
        expirations = expirations_used.len(),
        quotes = aggregation.summary.quotes_seen,
        points = aggregation.summary.points,
        defined_cells = surface.defined_count(),
        "volatility surface ready"
    );

    Ok(PipelineOutput {
        surface,
        points: aggregation.points,
        report: PipelineReport {
            ticker: ticker.to_string(),
            valuation_date,
            spot,
            expirations_used,
            aggregation: aggregation.summary,
        },
    })
}

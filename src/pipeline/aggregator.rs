//! Quote filtering and per-quote implied volatility extraction.

use tracing::{debug, trace};

use crate::models::implied::{solve_implied_vol_with_config, IvInputs, IvSolution};
use crate::models::surface::ImpliedVolatilityPoint;

use super::config::AggregatorConfig;
use super::types::{Aggregation, AggregationSummary, OptionQuote};

/// Solves every usable quote and collects the converged volatilities.
///
/// A quote is skipped when its price is not strictly positive, its expiry is not in the
/// future, or its side is not selected. Quotes whose solve does not converge, or that
/// converge above `config.max_volatility`, are dropped and counted. Nothing here fails;
/// an empty result is for the caller to judge.
pub fn aggregate_quotes(
    quotes: &[OptionQuote],
    spot: f64,
    config: &AggregatorConfig,
) -> Aggregation {
    let mut summary = AggregationSummary {
        quotes_seen: quotes.len(),
        ..Default::default()
    };
    let mut points = Vec::with_capacity(quotes.len());

    for quote in quotes {
        if !(quote.market_price > 0.0 && quote.market_price.is_finite()) {
            summary.rejected_price += 1;
            continue;
        }
        if quote.expiry_days_from_now <= 0 {
            summary.rejected_expiry += 1;
            continue;
        }
        if !config.sides.contains(&quote.side) {
            summary.skipped_side += 1;
            continue;
        }

        let inputs = IvInputs {
            market_price: quote.market_price,
            spot,
            strike: quote.strike,
            time_to_maturity: quote.years_to_expiry(),
            risk_free_rate: config.risk_free_rate,
            side: quote.side,
        };

        match solve_implied_vol_with_config(&inputs, &config.solver) {
            IvSolution::Converged { volatility, .. } if volatility > config.max_volatility => {
                trace!(strike = quote.strike, volatility, "implied vol above ceiling");
                summary.out_of_bounds += 1;
            }
            IvSolution::Converged { volatility, .. } => {
                points.push(ImpliedVolatilityPoint {
                    strike: quote.strike,
                    maturity_days: quote.expiry_days_from_now as f64,
                    implied_volatility: volatility,
                });
            }
            IvSolution::NotConverged { reason } => {
                debug!(
                    strike = quote.strike,
                    days = quote.expiry_days_from_now,
                    price = quote.market_price,
                    ?reason,
                    "dropping quote without implied vol"
                );
                summary.unconverged += 1;
            }
        }
    }

    summary.points = points.len();
    debug!(?summary, "quotes aggregated");
    Aggregation { points, summary }
}

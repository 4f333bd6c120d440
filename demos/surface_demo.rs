// demos/surface_demo.rs

//! Builds an implied volatility surface and writes it as an SVG heat map.
//!
//! Usage:
//!     cargo run --example surface_demo
//!     cargo run --example surface_demo -- <chain.csv> <spots.csv> <config.toml>
//!
//! Without arguments a synthetic chain with a skewed smile is generated in memory.
//! The chart is written to `iv_surface.svg` in the working directory.

use std::env;

use anyhow::{bail, Result};
use chrono::{Days, Local};
use ivsurface_lib::{
    build_surface_for_ticker, default_configs, price, render_surface_with_samples,
    surface_from_files, ChainQuote, OptionSide, PipelineOutput, PricingParameters,
    StaticMarketData,
};
use tracing::info;

const DEMO_TICKER: &str = "DEMO";
const DEMO_SPOT: f64 = 250.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (output, title) = match args.as_slice() {
        [] => (run_synthetic()?, format!("{DEMO_TICKER} (synthetic)")),
        [chains, spots, config] => {
            let output = surface_from_files(chains, spots, config)?;
            let title = output.report.ticker.clone();
            (output, title)
        }
        _ => bail!("usage: surface_demo [<chain.csv> <spots.csv> <config.toml>]"),
    };

    print_summary(&output);
    render_surface_with_samples(&output.surface, &output.points, "iv_surface.svg", &title)?;
    info!("chart saved to iv_surface.svg");
    Ok(())
}

fn run_synthetic() -> Result<PipelineOutput> {
    let today = Local::now().date_naive();
    let mut market = StaticMarketData::new().with_spot(DEMO_TICKER, DEMO_SPOT);

    for days in [3u64, 7, 10, 14, 21, 28, 35] {
        let Some(expiration) = today.checked_add_days(Days::new(days)) else {
            bail!("date overflow adding {days} days");
        };
        for i in 0..17 {
            let strike = 210.0 + 5.0 * i as f64;
            let params = PricingParameters {
                spot: DEMO_SPOT,
                strike,
                time_to_maturity: days as f64 / 365.0,
                risk_free_rate: 0.05,
                volatility: demo_vol(strike, days as f64),
                side: OptionSide::Call,
            };
            market.add_quote(
                DEMO_TICKER,
                expiration,
                ChainQuote {
                    strike,
                    side: OptionSide::Call,
                    last_price: price(&params)?,
                },
            );
        }
    }

    let mut config = default_configs::production(DEMO_TICKER);
    config.valuation_date = Some(today);
    Ok(build_surface_for_ticker(&market, &config)?)
}

/// Downward skew that flattens with maturity.
fn demo_vol(strike: f64, days: f64) -> f64 {
    let m = (strike / DEMO_SPOT).ln();
    let skew = -0.6 / (1.0 + days / 14.0);
    (0.24 + skew * m + 1.2 * m * m).max(0.05)
}

fn print_summary(output: &PipelineOutput) {
    let report = &output.report;
    let summary = &report.aggregation;
    println!("Implied Volatility Surface Demo");
    println!("===============================");
    println!("Ticker:          {}", report.ticker);
    println!("Valuation date:  {}", report.valuation_date);
    println!("Spot:            {:.2}", report.spot);
    println!("Expirations:     {}", report.expirations_used.len());
    println!(
        "Quotes:          {} seen, {} solved, {} unconverged, {} filtered",
        summary.quotes_seen,
        summary.points,
        summary.unconverged,
        summary.rejected_price + summary.rejected_expiry + summary.skipped_side + summary.out_of_bounds
    );

    let (g, m) = output.surface.shape();
    println!("Grid:            {g} x {m}, {} cells defined", output.surface.defined_count());
    if let Some((lo, hi)) = output.surface.value_range() {
        println!("IV range:        {:.2}% to {:.2}%", lo * 100.0, hi * 100.0);
    }

    println!();
    println!("{:>10} {:>8} {:>10}", "Strike", "Days", "IV (%)");
    println!("{}", "-".repeat(30));
    let step = (g / 6).max(1);
    for i in (0..g).step_by(step) {
        let j = m / 2;
        let iv = output
            .surface
            .get(i, j)
            .map_or_else(|| "-".to_string(), |v| format!("{:.2}", v * 100.0));
        println!(
            "{:>10.2} {:>8.1} {:>10}",
            output.surface.strike_grid[i], output.surface.maturity_grid[j], iv
        );
    }
}

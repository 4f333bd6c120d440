//! Option chain and spot price sources.
//!
//! The pipeline only needs three queries: which expirations exist, the chain for one
//! expiration, and the current spot. Providers report failures as [`anyhow::Error`];
//! the pipeline wraps them into [`crate::SurfaceError::DataFetch`].

pub mod csv_file;
pub mod memory;

pub use csv_file::CsvChainProvider;
pub use memory::StaticMarketData;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::bs::OptionSide;

/// One listed contract as a provider returns it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainQuote {
    pub strike: f64,
    pub side: OptionSide,
    pub last_price: f64,
}

/// Source of option chains and spot prices for a ticker.
pub trait MarketDataProvider {
    /// Listed expiration dates, in any order.
    fn list_expirations(&self, ticker: &str) -> anyhow::Result<Vec<NaiveDate>>;

    /// Calls and puts listed for `expiration`.
    fn fetch_option_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
    ) -> anyhow::Result<Vec<ChainQuote>>;

    fn fetch_spot_price(&self, ticker: &str) -> anyhow::Result<f64>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for &P {
    fn list_expirations(&self, ticker: &str) -> anyhow::Result<Vec<NaiveDate>> {
        (**self).list_expirations(ticker)
    }

    fn fetch_option_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
    ) -> anyhow::Result<Vec<ChainQuote>> {
        (**self).fetch_option_chain(ticker, expiration)
    }

    fn fetch_spot_price(&self, ticker: &str) -> anyhow::Result<f64> {
        (**self).fetch_spot_price(ticker)
    }
}

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use super::{ChainQuote, MarketDataProvider};

#[derive(Debug, Clone, Default)]
struct TickerBook {
    spot: Option<f64>,
    chains: BTreeMap<NaiveDate, Vec<ChainQuote>>,
}

/// In-memory provider, filled up front.
///
/// ```
/// use chrono::NaiveDate;
/// use ivsurface_lib::market_data::{ChainQuote, MarketDataProvider, StaticMarketData};
/// use ivsurface_lib::OptionSide;
///
/// let expiry = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap();
/// let data = StaticMarketData::new()
///     .with_spot("AAPL", 230.0)
///     .with_quote(
///         "AAPL",
///         expiry,
///         ChainQuote { strike: 230.0, side: OptionSide::Call, last_price: 4.1 },
///     );
///
/// assert_eq!(data.list_expirations("AAPL").unwrap(), vec![expiry]);
/// assert_eq!(data.fetch_spot_price("AAPL").unwrap(), 230.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    books: HashMap<String, TickerBook>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_spot(mut self, ticker: &str, spot: f64) -> Self {
        self.set_spot(ticker, spot);
        self
    }

    #[must_use]
    pub fn with_quote(mut self, ticker: &str, expiration: NaiveDate, quote: ChainQuote) -> Self {
        self.add_quote(ticker, expiration, quote);
        self
    }

    #[must_use]
    pub fn with_chain(
        mut self,
        ticker: &str,
        expiration: NaiveDate,
        quotes: impl IntoIterator<Item = ChainQuote>,
    ) -> Self {
        self.books
            .entry(ticker.to_string())
            .or_default()
            .chains
            .entry(expiration)
            .or_default()
            .extend(quotes);
        self
    }

    pub fn set_spot(&mut self, ticker: &str, spot: f64) {
        self.books.entry(ticker.to_string()).or_default().spot = Some(spot);
    }

    pub fn add_quote(&mut self, ticker: &str, expiration: NaiveDate, quote: ChainQuote) {
        self.books
            .entry(ticker.to_string())
            .or_default()
            .chains
            .entry(expiration)
            .or_default()
            .push(quote);
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.books.keys().map(String::as_str)
    }

    fn book(&self, ticker: &str) -> Result<&TickerBook> {
        self.books
            .get(ticker)
            .ok_or_else(|| anyhow!("unknown ticker {ticker}"))
    }
}

impl MarketDataProvider for StaticMarketData {
    fn list_expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>> {
        Ok(self.book(ticker)?.chains.keys().copied().collect())
    }

    fn fetch_option_chain(&self, ticker: &str, expiration: NaiveDate) -> Result<Vec<ChainQuote>> {
        self.book(ticker)?
            .chains
            .get(&expiration)
            .cloned()
            .ok_or_else(|| anyhow!("no option chain for {ticker} expiring {expiration}"))
    }

    fn fetch_spot_price(&self, ticker: &str) -> Result<f64> {
        self.book(ticker)?
            .spot
            .ok_or_else(|| anyhow!("no spot price for {ticker}"))
    }
}

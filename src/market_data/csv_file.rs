use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{ChainQuote, MarketDataProvider, StaticMarketData};
use crate::models::bs::OptionSide;

/// Chain file row: `ticker,expiration,side,strike,last_price`
#[derive(Debug, Deserialize)]
struct ChainRow {
    ticker: String,
    expiration: NaiveDate,
    side: String,
    strike: f64,
    last_price: f64,
}

/// Spot file row: `ticker,spot`
#[derive(Debug, Deserialize)]
struct SpotRow {
    ticker: String,
    spot: f64,
}

/// Provider backed by option chain and spot price CSV files.
///
/// Both files are read and validated when the provider is built, so a malformed row
/// fails construction with the offending line number rather than a later query.
#[derive(Debug, Clone)]
pub struct CsvChainProvider {
    data: StaticMarketData,
}

impl CsvChainProvider {
    pub fn from_paths(chain_path: impl AsRef<Path>, spot_path: impl AsRef<Path>) -> Result<Self> {
        let chain_path = chain_path.as_ref();
        let spot_path = spot_path.as_ref();
        let chains = std::fs::File::open(chain_path)
            .with_context(|| format!("opening chain file {}", chain_path.display()))?;
        let spots = std::fs::File::open(spot_path)
            .with_context(|| format!("opening spot file {}", spot_path.display()))?;
        Self::from_readers(chains, spots).with_context(|| {
            format!("loading {} and {}", chain_path.display(), spot_path.display())
        })
    }

    pub fn from_readers(chains: impl Read, spots: impl Read) -> Result<Self> {
        let mut data = StaticMarketData::new();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(spots);
        for (idx, row) in reader.deserialize::<SpotRow>().enumerate() {
            let line = idx + 2;
            let row = row.with_context(|| format!("spot file line {line}"))?;
            if !(row.spot > 0.0 && row.spot.is_finite()) {
                bail!(
                    "spot file line {line}: spot for {} must be positive, got {}",
                    row.ticker,
                    row.spot
                );
            }
            data.set_spot(&row.ticker, row.spot);
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(chains);
        for (idx, row) in reader.deserialize::<ChainRow>().enumerate() {
            let line = idx + 2;
            let row = row.with_context(|| format!("chain file line {line}"))?;
            let side: OptionSide = row
                .side
                .parse()
                .map_err(|e: String| anyhow!("chain file line {line}: {e}"))?;
            if !(row.strike > 0.0 && row.strike.is_finite()) {
                bail!("chain file line {line}: strike must be positive, got {}", row.strike);
            }
            data.add_quote(
                &row.ticker,
                row.expiration,
                ChainQuote {
                    strike: row.strike,
                    side,
                    last_price: row.last_price,
                },
            );
        }

        Ok(Self { data })
    }
}

impl MarketDataProvider for CsvChainProvider {
    fn list_expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>> {
        self.data.list_expirations(ticker)
    }

    fn fetch_option_chain(&self, ticker: &str, expiration: NaiveDate) -> Result<Vec<ChainQuote>> {
        self.data.fetch_option_chain(ticker, expiration)
    }

    fn fetch_spot_price(&self, ticker: &str) -> Result<f64> {
        self.data.fetch_spot_price(ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPOTS: &str = "ticker,spot\nXYZ,100.5\n";

    #[test]
    fn test_parses_chain_rows() {
        let chain = "ticker,expiration,side,strike,last_price\n\
                     XYZ,2025-03-21,call,100,3.2\n\
                     XYZ, 2025-03-21 ,P,95,1.1\n\
                     XYZ,2025-04-17,C,105,2.0\n";
        let provider = CsvChainProvider::from_readers(chain.as_bytes(), SPOTS.as_bytes()).unwrap();

        let expirations = provider.list_expirations("XYZ").unwrap();
        assert_eq!(expirations.len(), 2);
        let first = provider.fetch_option_chain("XYZ", expirations[0]).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].side, OptionSide::Put);
        assert_eq!(first[1].strike, 95.0);
        assert_eq!(provider.fetch_spot_price("XYZ").unwrap(), 100.5);
    }

    #[test]
    fn test_rejects_malformed_rows() {
        let bad_side = "ticker,expiration,side,strike,last_price\nXYZ,2025-03-21,straddle,100,3.2\n";
        let err =
            CsvChainProvider::from_readers(bad_side.as_bytes(), SPOTS.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");

        let bad_date = "ticker,expiration,side,strike,last_price\nXYZ,21/03/2025,call,100,3.2\n";
        assert!(CsvChainProvider::from_readers(bad_date.as_bytes(), SPOTS.as_bytes()).is_err());

        let bad_strike = "ticker,expiration,side,strike,last_price\nXYZ,2025-03-21,call,abc,3.2\n";
        assert!(CsvChainProvider::from_readers(bad_strike.as_bytes(), SPOTS.as_bytes()).is_err());

        let chain = "ticker,expiration,side,strike,last_price\n";
        let bad_spot = "ticker,spot\nXYZ,-1\n";
        assert!(CsvChainProvider::from_readers(chain.as_bytes(), bad_spot.as_bytes()).is_err());
    }
}

use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfaceError};
use crate::models::bs::OptionSide;
use crate::models::implied::SolverConfig;
use crate::models::surface::SurfaceConfig;

/// Settings for turning quotes into implied volatility points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Continuously compounded risk-free rate
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Option sides to solve. Calls only by default.
    #[serde(default = "default_sides")]
    pub sides: Vec<OptionSide>,

    /// Converged volatilities above this are discarded
    #[serde(default = "default_max_volatility")]
    pub max_volatility: f64,

    #[serde(default)]
    pub solver: SolverConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            sides: default_sides(),
            max_volatility: default_max_volatility(),
            solver: SolverConfig::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(SurfaceError::invalid_config(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        if self.sides.is_empty() {
            return Err(SurfaceError::invalid_config(
                "at least one option side must be selected",
            ));
        }
        if !(self.max_volatility > 0.0) {
            return Err(SurfaceError::invalid_config(format!(
                "max_volatility must be positive, got {}",
                self.max_volatility
            )));
        }
        if self.solver.max_iterations == 0 || !(self.solver.tolerance > 0.0) {
            return Err(SurfaceError::invalid_config(
                "solver needs max_iterations > 0 and a positive tolerance",
            ));
        }
        Ok(())
    }
}

/// Full configuration for a ticker-to-surface run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Underlying symbol passed to the market data provider
    pub ticker: String,

    /// Only expirations with 0 < days <= max_days are used
    #[serde(default = "default_max_days")]
    pub max_days: i64,

    /// Date days-to-expiry are measured from. Today when absent.
    #[serde(default)]
    pub valuation_date: Option<NaiveDate>,

    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    #[serde(default = "default_sides")]
    pub sides: Vec<OptionSide>,

    #[serde(default = "default_max_volatility")]
    pub max_volatility: f64,

    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub surface: SurfaceConfig,
}

impl PipelineConfig {
    /// Defaults for `ticker`: 30-day horizon, 5% rate, calls only, 50x50 grid.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            max_days: default_max_days(),
            valuation_date: None,
            risk_free_rate: default_risk_free_rate(),
            sides: default_sides(),
            max_volatility: default_max_volatility(),
            solver: SolverConfig::default(),
            surface: SurfaceConfig::default(),
        }
    }

    /// Full 50x50 grid with the standard solver settings.
    pub fn production(ticker: impl Into<String>) -> Self {
        Self::new(ticker)
    }

    /// Coarser grid and a shorter solver budget for interactive use.
    pub fn fast(ticker: impl Into<String>) -> Self {
        Self {
            solver: SolverConfig::default().with_max_iterations(50),
            surface: SurfaceConfig::with_resolution(25),
            ..Self::new(ticker)
        }
    }

    /// Both sides, a 90-day horizon, a 100x100 grid and a tight price tolerance.
    pub fn research(ticker: impl Into<String>) -> Self {
        Self {
            max_days: 90,
            sides: vec![OptionSide::Call, OptionSide::Put],
            solver: SolverConfig::default()
                .with_max_iterations(200)
                .with_tolerance(1e-8),
            surface: SurfaceConfig::with_resolution(100),
            ..Self::new(ticker)
        }
    }

    /// Smallest useful run, for smoke tests.
    pub fn minimal(ticker: impl Into<String>) -> Self {
        Self {
            solver: SolverConfig::default()
                .with_max_iterations(20)
                .with_tolerance(1e-4),
            surface: SurfaceConfig::with_resolution(10),
            ..Self::new(ticker)
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid pipeline configuration")?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    #[must_use]
    pub fn with_valuation_date(mut self, date: NaiveDate) -> Self {
        self.valuation_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_sides(mut self, sides: Vec<OptionSide>) -> Self {
        self.sides = sides;
        self
    }

    /// The quote-aggregation subset of this configuration.
    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            risk_free_rate: self.risk_free_rate,
            sides: self.sides.clone(),
            max_volatility: self.max_volatility,
            solver: self.solver.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(SurfaceError::invalid_config("ticker must not be empty"));
        }
        if self.max_days <= 0 {
            return Err(SurfaceError::invalid_config(format!(
                "max_days must be positive, got {}",
                self.max_days
            )));
        }
        self.aggregator().validate()?;
        self.surface.validate()
    }
}

fn default_max_days() -> i64 {
    30
}

fn default_risk_free_rate() -> f64 {
    0.05
}

fn default_sides() -> Vec<OptionSide> {
    vec![OptionSide::Call]
}

fn default_max_volatility() -> f64 {
    5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = PipelineConfig::from_toml_str(r#"ticker = "AAPL""#).unwrap();
        assert_eq!(config, PipelineConfig::new("AAPL"));
        assert_eq!(config.max_days, 30);
        assert_eq!(config.risk_free_rate, 0.05);
        assert_eq!(config.sides, vec![OptionSide::Call]);
        assert_eq!(config.surface.strike_points, 50);
        assert_eq!(config.surface.maturity_points, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_toml() {
        let text = r#"
            ticker = "SPY"
            max_days = 45
            valuation_date = "2025-01-02"
            risk_free_rate = 0.04
            sides = ["call", "put"]

            [solver]
            max_iterations = 50

            [surface]
            strike_points = 30
            maturity_points = 20
            rescale = true
        "#;
        let config = PipelineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.max_days, 45);
        assert_eq!(
            config.valuation_date,
            Some(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
        );
        assert_eq!(config.sides, vec![OptionSide::Call, OptionSide::Put]);
        assert_eq!(config.solver.max_iterations, 50);
        assert_eq!(config.solver.tolerance, 1e-5);
        assert_eq!(config.surface.strike_points, 30);
        assert!(config.surface.rescale);
        assert_eq!(config.aggregator().risk_free_rate, 0.04);
    }

    #[test]
    fn test_presets_validate() {
        for config in [
            PipelineConfig::production("SPY"),
            PipelineConfig::fast("SPY"),
            PipelineConfig::research("SPY"),
            PipelineConfig::minimal("SPY"),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
        }
        assert_eq!(PipelineConfig::research("SPY").surface.strike_points, 100);
        assert_eq!(PipelineConfig::fast("SPY").solver.max_iterations, 50);
    }

    #[test]
    fn test_missing_ticker_is_an_error() {
        assert!(PipelineConfig::from_toml_str("max_days = 10").is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = PipelineConfig::new("AAPL");
        config.max_days = 0;
        assert!(config.validate().is_err());

        let config = PipelineConfig::new("AAPL").with_sides(vec![]);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::new("AAPL");
        config.risk_free_rate = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(SurfaceError::InvalidConfig { .. })
        ));

        assert!(PipelineConfig::new("  ").validate().is_err());
    }
}

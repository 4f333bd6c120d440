// Lognormal (Black-Scholes) pricing of European options without a dividend term.
// The only failure mode is a domain error, checked before any logarithm or square root
// is evaluated.

use std::f64::consts::{PI, SQRT_2};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::error::DomainError;

/// Option side. Parsed from strings only at the I/O boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    #[serde(alias = "c", alias = "C", alias = "Call", alias = "CALL")]
    Call,
    #[serde(alias = "p", alias = "P", alias = "Put", alias = "PUT")]
    Put,
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionSide::Call => write!(f, "call"),
            OptionSide::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionSide::Call),
            "put" | "p" => Ok(OptionSide::Put),
            other => Err(format!("unknown option side: {other:?}")),
        }
    }
}

/// Inputs to a single pricing evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingParameters {
    pub spot: f64,
    pub strike: f64,
    /// Time to maturity in years.
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub side: OptionSide,
}

impl PricingParameters {
    /// Copy of these parameters with a different volatility.
    pub fn with_volatility(self, volatility: f64) -> Self {
        Self { volatility, ..self }
    }

    /// Checks every input against the valid domain of the pricing formula.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.spot > 0.0 && self.spot.is_finite()) {
            return Err(DomainError::Spot(self.spot));
        }
        if !(self.strike > 0.0 && self.strike.is_finite()) {
            return Err(DomainError::Strike(self.strike));
        }
        if !(self.time_to_maturity > 0.0 && self.time_to_maturity.is_finite()) {
            return Err(DomainError::TimeToMaturity(self.time_to_maturity));
        }
        if !(self.volatility > 0.0 && self.volatility.is_finite()) {
            return Err(DomainError::Volatility(self.volatility));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(DomainError::Rate(self.risk_free_rate));
        }
        Ok(())
    }
}

/// Theoretical price and its sensitivity to volatility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingResult {
    pub price: f64,
    pub vega: f64,
}

/// Standard normal cumulative distribution function.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal probability density.
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Price and vega of a European option.
pub fn price_and_vega(params: &PricingParameters) -> Result<PricingResult, DomainError> {
    params.validate()?;

    let PricingParameters {
        spot: s,
        strike: k,
        time_to_maturity: t,
        risk_free_rate: r,
        volatility: sigma,
        side,
    } = *params;

    let sqrt_t = t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;
    let discount = (-r * t).exp();

    let price = match side {
        OptionSide::Call => s * norm_cdf(d1) - k * discount * norm_cdf(d2),
        OptionSide::Put => k * discount * norm_cdf(-d2) - s * norm_cdf(-d1),
    };
    let vega = s * norm_pdf(d1) * sqrt_t;

    Ok(PricingResult { price, vega })
}

/// Price of a European option; see [`price_and_vega`].
pub fn price(params: &PricingParameters) -> Result<f64, DomainError> {
    price_and_vega(params).map(|res| res.price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atm_call() -> PricingParameters {
        PricingParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_maturity: 0.25,
            risk_free_rate: 0.05,
            volatility: 0.30,
            side: OptionSide::Call,
        }
    }

    #[test]
    fn test_atm_call_reference_price() {
        let res = price_and_vega(&atm_call()).unwrap();
        assert!((res.price - 6.5831).abs() < 1e-4, "price = {}", res.price);
        // S * phi(d1) * sqrt(T) with d1 = 0.158333
        assert!((res.vega - 19.6986).abs() < 1e-3, "vega = {}", res.vega);
    }

    #[test]
    fn test_put_call_parity() {
        let call = atm_call();
        for &strike in &[80.0, 95.0, 100.0, 120.0] {
            let c = price(&PricingParameters { strike, ..call }).unwrap();
            let p = price(&PricingParameters {
                strike,
                side: OptionSide::Put,
                ..call
            })
            .unwrap();
            let parity = call.spot - strike * (-call.risk_free_rate * call.time_to_maturity).exp();
            assert!((c - p - parity).abs() < 1e-10, "strike {strike}");
        }
    }

    #[test]
    fn test_vega_identical_for_both_sides() {
        let call = price_and_vega(&atm_call()).unwrap();
        let put = price_and_vega(&PricingParameters {
            side: OptionSide::Put,
            ..atm_call()
        })
        .unwrap();
        assert!((call.vega - put.vega).abs() < 1e-12);
    }

    #[test]
    fn test_domain_errors() {
        let base = atm_call();
        assert_eq!(
            price_and_vega(&PricingParameters { spot: 0.0, ..base }),
            Err(DomainError::Spot(0.0))
        );
        assert_eq!(
            price_and_vega(&PricingParameters { strike: -5.0, ..base }),
            Err(DomainError::Strike(-5.0))
        );
        assert_eq!(
            price_and_vega(&PricingParameters {
                time_to_maturity: 0.0,
                ..base
            }),
            Err(DomainError::TimeToMaturity(0.0))
        );
        assert_eq!(
            price_and_vega(&base.with_volatility(-0.01)),
            Err(DomainError::Volatility(-0.01))
        );
        assert!(price_and_vega(&base.with_volatility(f64::NAN)).is_err());
    }

    #[test]
    fn test_option_side_parsing() {
        assert_eq!("call".parse::<OptionSide>().unwrap(), OptionSide::Call);
        assert_eq!(" P ".parse::<OptionSide>().unwrap(), OptionSide::Put);
        assert_eq!("PUT".parse::<OptionSide>().unwrap(), OptionSide::Put);
        assert!("straddle".parse::<OptionSide>().is_err());
    }

    #[test]
    fn test_norm_cdf_symmetry() {
        for &x in &[0.0, 0.5, 1.0, 2.5] {
            assert!((norm_cdf(x) + norm_cdf(-x) - 1.0).abs() < 1e-12);
        }
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-12);
    }
}

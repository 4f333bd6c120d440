//! Implied volatility inversion of the lognormal pricing model.
//!
//! The solver runs a plain Newton-Raphson iteration from a fixed initial guess. When
//! vega collapses (deep in/out of the money, very short maturities) the Newton step is
//! replaced by a fixed upward increment instead of dividing by a near-zero derivative.
//! There is no bracketing fallback: quotes that do not converge within the iteration cap
//! are reported as [`IvSolution::NotConverged`] and dropped by the aggregator.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{DomainError, SurfaceError};
use crate::models::bs::{price_and_vega, OptionSide, PricingParameters};

/// Newton-Raphson solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Volatility the iteration starts from
    #[serde(default = "default_initial_guess")]
    pub initial_guess: f64,

    /// Hard cap on pricing evaluations per quote
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Absolute price tolerance; also the vega threshold below which the
    /// fallback step is taken
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Volatility increment used when vega is below `tolerance`
    #[serde(default = "default_fallback_step")]
    pub fallback_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: default_initial_guess(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            fallback_step: default_fallback_step(),
        }
    }
}

impl SolverConfig {
    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the initial volatility guess.
    #[must_use]
    pub fn with_initial_guess(mut self, initial_guess: f64) -> Self {
        self.initial_guess = initial_guess;
        self
    }
}

fn default_initial_guess() -> f64 {
    0.2
}

fn default_max_iterations() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-5
}

fn default_fallback_step() -> f64 {
    0.01
}

/// Why a solve did not produce a volatility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NonConvergence {
    /// The pricing model rejected the inputs at some iterate.
    Domain(DomainError),
    /// The iteration cap was reached without meeting the tolerance.
    IterationLimit { last_volatility: f64 },
}

/// Outcome of an implied volatility solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IvSolution {
    Converged { volatility: f64, iterations: usize },
    NotConverged { reason: NonConvergence },
}

impl IvSolution {
    /// The recovered volatility, if the solve converged.
    pub fn volatility(&self) -> Option<f64> {
        match self {
            IvSolution::Converged { volatility, .. } => Some(*volatility),
            IvSolution::NotConverged { .. } => None,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, IvSolution::Converged { .. })
    }

    /// Converts into a `Result`, for callers that want `?` propagation.
    pub fn into_result(self, max_iterations: usize) -> Result<f64, SurfaceError> {
        match self {
            IvSolution::Converged { volatility, .. } => Ok(volatility),
            IvSolution::NotConverged {
                reason: NonConvergence::Domain(err),
            } => Err(SurfaceError::Domain(err)),
            IvSolution::NotConverged {
                reason: NonConvergence::IterationLimit { last_volatility },
            } => Err(SurfaceError::ConvergenceFailure {
                iterations: max_iterations,
                last_volatility,
            }),
        }
    }
}

/// Market observation to invert: everything except the volatility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvInputs {
    pub market_price: f64,
    pub spot: f64,
    pub strike: f64,
    /// Time to maturity in years.
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub side: OptionSide,
}

impl IvInputs {
    fn pricing_parameters(&self, volatility: f64) -> PricingParameters {
        PricingParameters {
            spot: self.spot,
            strike: self.strike,
            time_to_maturity: self.time_to_maturity,
            risk_free_rate: self.risk_free_rate,
            volatility,
            side: self.side,
        }
    }
}

/// Solves for implied volatility with the default [`SolverConfig`].
pub fn solve_implied_vol(inputs: &IvInputs) -> IvSolution {
    solve_implied_vol_with_config(inputs, &SolverConfig::default())
}

/// Solves for implied volatility using Newton-Raphson.
///
/// Each iteration validates and prices at the current estimate. A domain failure ends
/// the solve immediately; there is no retry from a different starting point.
pub fn solve_implied_vol_with_config(inputs: &IvInputs, config: &SolverConfig) -> IvSolution {
    let mut sigma = config.initial_guess;

    for iteration in 0..config.max_iterations {
        let eval = match price_and_vega(&inputs.pricing_parameters(sigma)) {
            Ok(eval) => eval,
            Err(err) => {
                trace!(strike = inputs.strike, sigma, %err, "implied vol solve hit domain error");
                return IvSolution::NotConverged {
                    reason: NonConvergence::Domain(err),
                };
            }
        };

        let diff = inputs.market_price - eval.price;
        if diff.abs() < config.tolerance {
            trace!(
                strike = inputs.strike,
                sigma,
                iterations = iteration + 1,
                "implied vol converged"
            );
            return IvSolution::Converged {
                volatility: sigma,
                iterations: iteration + 1,
            };
        }

        if eval.vega > config.tolerance {
            sigma += diff / eval.vega;
        } else {
            sigma += config.fallback_step;
        }
    }

    trace!(
        strike = inputs.strike,
        last_volatility = sigma,
        "implied vol hit iteration cap"
    );
    IvSolution::NotConverged {
        reason: NonConvergence::IterationLimit {
            last_volatility: sigma,
        },
    }
}

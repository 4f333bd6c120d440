use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfaceError};

/// One solved quote: implied volatility at a (strike, days-to-maturity) site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpliedVolatilityPoint {
    pub strike: f64,
    /// Calendar days to expiry
    pub maturity_days: f64,
    /// Annualised implied volatility (decimal, e.g. 0.25 for 25%)
    pub implied_volatility: f64,
}

/// Configuration for gridding scattered implied volatilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Number of strike nodes (G)
    #[serde(default = "default_grid_points")]
    pub strike_points: usize,

    /// Number of maturity nodes (M)
    #[serde(default = "default_grid_points")]
    pub maturity_points: usize,

    /// Minimum number of distinct sample sites
    #[serde(default = "default_min_points")]
    pub min_points: usize,

    /// Normalise both axes to [0, 1] before triangulating. Off by default, so strike
    /// and day units are triangulated as given.
    #[serde(default)]
    pub rescale: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            strike_points: default_grid_points(),
            maturity_points: default_grid_points(),
            min_points: default_min_points(),
            rescale: false,
        }
    }
}

impl SurfaceConfig {
    /// Square grid with `n` nodes per axis.
    pub fn with_resolution(n: usize) -> Self {
        Self {
            strike_points: n,
            maturity_points: n,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.strike_points < 2 || self.maturity_points < 2 {
            return Err(SurfaceError::invalid_config(format!(
                "grid needs at least 2 nodes per axis, got {}x{}",
                self.strike_points, self.maturity_points
            )));
        }
        if self.min_points < 3 {
            return Err(SurfaceError::invalid_config(format!(
                "min_points must be at least 3 for triangulation, got {}",
                self.min_points
            )));
        }
        Ok(())
    }
}

fn default_grid_points() -> usize {
    50
}

fn default_min_points() -> usize {
    4
}

/// Implied volatility on a regular strike x maturity grid.
///
/// `volatility[i][j]` is the value at `strike_grid[i]`, `maturity_grid[j]`. Cells
/// outside the convex hull of the samples are `None`; they are never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySurface {
    pub strike_grid: Vec<f64>,
    pub maturity_grid: Vec<f64>,
    pub volatility: Vec<Vec<Option<f64>>>,
}

impl VolatilitySurface {
    /// Value at grid node (`strike_idx`, `maturity_idx`); `None` if undefined or out
    /// of range.
    pub fn get(&self, strike_idx: usize, maturity_idx: usize) -> Option<f64> {
        self.volatility
            .get(strike_idx)
            .and_then(|row| row.get(maturity_idx))
            .copied()
            .flatten()
    }

    /// Grid dimensions as (G, M).
    pub fn shape(&self) -> (usize, usize) {
        (self.strike_grid.len(), self.maturity_grid.len())
    }

    pub fn defined_count(&self) -> usize {
        self.volatility
            .iter()
            .map(|row| row.iter().filter(|v| v.is_some()).count())
            .sum()
    }

    /// Min and max over defined cells.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.volatility
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Flattened (strike, maturity_days, volatility) triples for defined cells.
    pub fn rows(&self) -> Vec<(f64, f64, f64)> {
        let mut out = Vec::with_capacity(self.defined_count());
        for (i, &k) in self.strike_grid.iter().enumerate() {
            for (j, &d) in self.maturity_grid.iter().enumerate() {
                if let Some(v) = self.get(i, j) {
                    out.push((k, d, v));
                }
            }
        }
        out
    }
}

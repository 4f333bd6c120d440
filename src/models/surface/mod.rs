//! Volatility surface construction from scattered implied volatilities.
//!
//! Samples are de-duplicated by site, triangulated, and interpolated with a
//! Clough-Tocher cubic onto an evenly spaced strike x maturity grid spanning the
//! observed ranges. Nodes outside the convex hull of the samples stay undefined.

pub mod clough_tocher;
pub mod delaunay;
pub mod types;

pub use clough_tocher::CloughTocher2d;
pub use delaunay::Triangulation;
pub use types::*;

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, SurfaceError};

/// Resolution used when grouping samples that share a (strike, maturity) site.
const SITE_KEY_SCALE: f64 = 1e8;

/// `n` evenly spaced values from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            grid[n - 1] = end;
            grid
        }
    }
}

/// Collapses samples sharing a site to their mean volatility, dropping non-finite or
/// non-positive values. Output is sorted by (strike, maturity).
pub fn merge_duplicate_sites(points: &[ImpliedVolatilityPoint]) -> Vec<ImpliedVolatilityPoint> {
    let mut sites: BTreeMap<(i64, i64), (f64, f64, f64, usize)> = BTreeMap::new();

    for p in points {
        if !(p.implied_volatility > 0.0 && p.implied_volatility.is_finite())
            || !p.strike.is_finite()
            || !p.maturity_days.is_finite()
        {
            debug!(?p, "skipping unusable implied volatility sample");
            continue;
        }
        let key = (
            (p.strike * SITE_KEY_SCALE).round() as i64,
            (p.maturity_days * SITE_KEY_SCALE).round() as i64,
        );
        let entry = sites
            .entry(key)
            .or_insert((p.strike, p.maturity_days, 0.0, 0));
        entry.2 += p.implied_volatility;
        entry.3 += 1;
    }

    sites
        .into_values()
        .map(|(strike, maturity_days, sum, count)| ImpliedVolatilityPoint {
            strike,
            maturity_days,
            implied_volatility: sum / count as f64,
        })
        .collect()
}

/// Builds a gridded surface from scattered implied volatility points.
///
/// # Errors
///
/// * [`SurfaceError::InvalidConfig`] for a grid with fewer than 2 nodes per axis
/// * [`SurfaceError::InsufficientData`] when fewer than `config.min_points` distinct
///   sites remain, when strikes or maturities span a single value, or when all sites
///   are collinear
pub fn build_surface(
    points: &[ImpliedVolatilityPoint],
    config: &SurfaceConfig,
) -> Result<VolatilitySurface> {
    config.validate()?;

    if points.is_empty() {
        return Err(SurfaceError::insufficient_data(
            "no implied volatility points to interpolate",
        ));
    }

    let samples = merge_duplicate_sites(points);
    if samples.len() < config.min_points {
        return Err(SurfaceError::insufficient_data(format!(
            "{} distinct sample sites, at least {} required",
            samples.len(),
            config.min_points
        )));
    }

    let (k_min, k_max) = min_max(samples.iter().map(|p| p.strike));
    let (d_min, d_max) = min_max(samples.iter().map(|p| p.maturity_days));
    if k_max <= k_min {
        return Err(SurfaceError::insufficient_data(format!(
            "all samples share strike {k_min}"
        )));
    }
    if d_max <= d_min {
        return Err(SurfaceError::insufficient_data(format!(
            "all samples share maturity {d_min} days"
        )));
    }

    let to_site = |strike: f64, days: f64| -> [f64; 2] {
        if config.rescale {
            [(strike - k_min) / (k_max - k_min), (days - d_min) / (d_max - d_min)]
        } else {
            [strike, days]
        }
    };

    let sites: Vec<[f64; 2]> = samples
        .iter()
        .map(|p| to_site(p.strike, p.maturity_days))
        .collect();
    let values: Vec<f64> = samples.iter().map(|p| p.implied_volatility).collect();
    let interpolator = CloughTocher2d::new(&sites, &values)?;

    let strike_grid = linspace(k_min, k_max, config.strike_points);
    let maturity_grid = linspace(d_min, d_max, config.maturity_points);

    let volatility: Vec<Vec<Option<f64>>> = strike_grid
        .iter()
        .map(|&k| {
            maturity_grid
                .iter()
                .map(|&d| {
                    let [x, y] = to_site(k, d);
                    interpolator.interpolate(x, y)
                })
                .collect()
        })
        .collect();

    let surface = VolatilitySurface {
        strike_grid,
        maturity_grid,
        volatility,
    };
    debug!(
        samples = samples.len(),
        triangles = interpolator.triangulation().triangles().len(),
        defined = surface.defined_count(),
        "volatility surface built"
    );
    Ok(surface)
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

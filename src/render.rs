//! SVG heat map of a [`VolatilitySurface`].

use std::path::Path;

use anyhow::{bail, Result};
use plotters::prelude::*;

use crate::models::surface::{ImpliedVolatilityPoint, VolatilitySurface};

const IMAGE_SIZE: (u32, u32) = (1280, 768);

/// Writes the surface as a strike x days heat map. Undefined cells are left blank.
pub fn render_surface_svg(
    surface: &VolatilitySurface,
    path: impl AsRef<Path>,
    title: &str,
) -> Result<()> {
    render_surface_with_samples(surface, &[], path, title)
}

/// Same as [`render_surface_svg`], with the solved sample sites drawn on top.
pub fn render_surface_with_samples(
    surface: &VolatilitySurface,
    samples: &[ImpliedVolatilityPoint],
    path: impl AsRef<Path>,
    title: &str,
) -> Result<()> {
    let Some((vol_min, vol_max)) = surface.value_range() else {
        bail!("surface has no defined cells to draw");
    };
    let (g, m) = surface.shape();
    if g < 2 || m < 2 {
        bail!("surface grid must be at least 2x2, got {g}x{m}");
    }

    let strikes = &surface.strike_grid;
    let days = &surface.maturity_grid;
    let half_dk = (strikes[g - 1] - strikes[0]) / (g - 1) as f64 / 2.0;
    let half_dd = (days[m - 1] - days[0]) / (m - 1) as f64 / 2.0;
    let x_range = (strikes[0] - half_dk)..(strikes[g - 1] + half_dk);
    let y_range = (days[0] - half_dd)..(days[m - 1] + half_dd);

    let root = SVGBackend::new(path.as_ref(), IMAGE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(
            format!("{title} | IV {:.1}% to {:.1}%", vol_min * 100.0, vol_max * 100.0),
            ("sans-serif", 30),
        )
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Strike")
        .y_desc("Days to expiry")
        .draw()?;

    let span = (vol_max - vol_min).max(f64::EPSILON);
    chart.draw_series(surface.rows().into_iter().map(|(k, d, v)| {
        let colour = heat_colour((v - vol_min) / span);
        Rectangle::new(
            [(k - half_dk, d - half_dd), (k + half_dk, d + half_dd)],
            colour.filled(),
        )
    }))?;

    chart.draw_series(
        samples
            .iter()
            .map(|p| Circle::new((p.strike, p.maturity_days), 3, BLACK.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Blue (low) through red (high) for `t` in [0, 1].
fn heat_colour(t: f64) -> HSLColor {
    HSLColor((1.0 - t.clamp(0.0, 1.0)) * 0.66, 0.85, 0.5)
}

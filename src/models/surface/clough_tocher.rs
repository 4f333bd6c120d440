//! Piecewise-cubic, C1-continuous interpolation of scattered data (Clough-Tocher).
//!
//! Each Delaunay triangle is split at its centroid into three cubic Bezier patches.
//! Vertex gradients are estimated globally by minimising the curvature of the
//! interpolant along triangulation edges (Nielson's energy), iterated Gauss-Seidel
//! style until the largest relative gradient update falls below a tolerance.

use tracing::debug;

use super::delaunay::Triangulation;
use crate::error::{Result, SurfaceError};

/// Cap on gradient estimation sweeps.
pub const GRADIENT_MAX_ITERATIONS: usize = 400;

/// Relative tolerance on gradient updates between sweeps.
pub const GRADIENT_TOLERANCE: f64 = 1e-6;

/// Scattered-data cubic interpolator over the convex hull of its sample sites.
#[derive(Debug, Clone)]
pub struct CloughTocher2d {
    triangulation: Triangulation,
    values: Vec<f64>,
    gradients: Vec<[f64; 2]>,
}

impl CloughTocher2d {
    /// Triangulates `sites` and estimates vertex gradients for `values`.
    pub fn new(sites: &[[f64; 2]], values: &[f64]) -> Result<Self> {
        if sites.len() != values.len() {
            return Err(SurfaceError::insufficient_data(format!(
                "{} sites but {} values",
                sites.len(),
                values.len()
            )));
        }
        let triangulation = Triangulation::new(sites)?;
        let gradients = estimate_gradients(
            &triangulation,
            values,
            GRADIENT_MAX_ITERATIONS,
            GRADIENT_TOLERANCE,
        );
        Ok(Self {
            triangulation,
            values: values.to_vec(),
            gradients,
        })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    pub fn gradients(&self) -> &[[f64; 2]] {
        &self.gradients
    }

    /// Interpolated value at `(x, y)`, or `None` outside the convex hull.
    pub fn interpolate(&self, x: f64, y: f64) -> Option<f64> {
        let (tri, bary) = self.triangulation.locate([x, y])?;
        let value = self.evaluate_patch(tri, bary);
        value.is_finite().then_some(value)
    }

    fn evaluate_patch(&self, itri: usize, b: [f64; 3]) -> f64 {
        let tri = &self.triangulation;
        let [i1, i2, i3] = tri.triangles()[itri];
        let pts = tri.points();
        let (p1, p2, p3) = (pts[i1], pts[i2], pts[i3]);

        let e12 = [p2[0] - p1[0], p2[1] - p1[1]];
        let e23 = [p3[0] - p2[0], p3[1] - p2[1]];
        let e31 = [p1[0] - p3[0], p1[1] - p3[1]];

        let (f1, f2, f3) = (self.values[i1], self.values[i2], self.values[i3]);
        let (g1, g2, g3) = (self.gradients[i1], self.gradients[i2], self.gradients[i3]);

        // Directional derivatives along the edges, at each end.
        let df12 = g1[0] * e12[0] + g1[1] * e12[1];
        let df21 = -(g2[0] * e12[0] + g2[1] * e12[1]);
        let df23 = g2[0] * e23[0] + g2[1] * e23[1];
        let df32 = -(g3[0] * e23[0] + g3[1] * e23[1]);
        let df31 = g3[0] * e31[0] + g3[1] * e31[1];
        let df13 = -(g1[0] * e31[0] + g1[1] * e31[1]);

        let c3000 = f1;
        let c2100 = (df12 + 3.0 * c3000) / 3.0;
        let c2010 = (df13 + 3.0 * c3000) / 3.0;
        let c0300 = f2;
        let c1200 = (df21 + 3.0 * c0300) / 3.0;
        let c0210 = (df23 + 3.0 * c0300) / 3.0;
        let c0030 = f3;
        let c1020 = (df31 + 3.0 * c0030) / 3.0;
        let c0120 = (df32 + 3.0 * c0030) / 3.0;

        let c2001 = (c2100 + c2010 + c3000) / 3.0;
        let c0201 = (c1200 + c0300 + c0210) / 3.0;
        let c0021 = (c1020 + c0120 + c0030) / 3.0;

        // Cross-boundary derivative condition: the derivative towards the
        // neighbour's centroid varies linearly along each edge.
        let mut g = [-0.5; 3];
        for (k, gk) in g.iter_mut().enumerate() {
            let Some(nb) = tri.neighbors()[itri][k] else {
                continue;
            };
            let [j1, j2, j3] = tri.triangles()[nb];
            let centroid = [
                (pts[j1][0] + pts[j2][0] + pts[j3][0]) / 3.0,
                (pts[j1][1] + pts[j2][1] + pts[j3][1]) / 3.0,
            ];
            let c = tri.barycentric(itri, centroid);
            *gk = match k {
                0 => (2.0 * c[2] + c[1] - 1.0) / (2.0 - 3.0 * c[2] - 3.0 * c[1]),
                1 => (2.0 * c[0] + c[2] - 1.0) / (2.0 - 3.0 * c[0] - 3.0 * c[2]),
                _ => (2.0 * c[1] + c[0] - 1.0) / (2.0 - 3.0 * c[1] - 3.0 * c[0]),
            };
        }

        let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
            + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
            / 2.0;
        let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
            + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
            / 2.0;
        let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
            + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
            / 2.0;

        let c1002 = (c1101 + c1011 + c2001) / 3.0;
        let c0102 = (c1101 + c0111 + c0201) / 3.0;
        let c0012 = (c1011 + c0111 + c0021) / 3.0;
        let c0003 = (c1002 + c0102 + c0012) / 3.0;

        // Barycentric coordinates in the centroid-split sub-triangle; one of
        // b1..b3 is zero.
        let min_b = b[0].min(b[1]).min(b[2]);
        let b1 = b[0] - min_b;
        let b2 = b[1] - min_b;
        let b3 = b[2] - min_b;
        let b4 = 3.0 * min_b;

        b1.powi(3) * c3000
            + 3.0 * b1 * b1 * b2 * c2100
            + 3.0 * b1 * b1 * b3 * c2010
            + 3.0 * b1 * b1 * b4 * c2001
            + 3.0 * b1 * b2 * b2 * c1200
            + 6.0 * b1 * b2 * b4 * c1101
            + 3.0 * b1 * b3 * b3 * c1020
            + 6.0 * b1 * b3 * b4 * c1011
            + 3.0 * b1 * b4 * b4 * c1002
            + b2.powi(3) * c0300
            + 3.0 * b2 * b2 * b3 * c0210
            + 3.0 * b2 * b2 * b4 * c0201
            + 3.0 * b2 * b3 * b3 * c0120
            + 6.0 * b2 * b3 * b4 * c0111
            + 3.0 * b2 * b4 * b4 * c0102
            + b3.powi(3) * c0030
            + 3.0 * b3 * b3 * b4 * c0021
            + 3.0 * b3 * b4 * b4 * c0012
            + b4.powi(3) * c0003
    }
}

/// Estimates gradients at every site by minimising the integrated squared second
/// derivative of cubic edge interpolants, one vertex at a time.
fn estimate_gradients(
    tri: &Triangulation,
    values: &[f64],
    max_iterations: usize,
    tolerance: f64,
) -> Vec<[f64; 2]> {
    let pts = tri.points();
    let adjacency = tri.vertex_neighbors();
    let mut grad = vec![[0.0_f64; 2]; pts.len()];

    for sweep in 0..max_iterations {
        let mut err = 0.0_f64;

        for (i, neighbours) in adjacency.iter().enumerate() {
            let mut q = [0.0_f64; 3]; // q00, q01, q11
            let mut s = [0.0_f64; 2];

            for &j in neighbours {
                let ex = pts[j][0] - pts[i][0];
                let ey = pts[j][1] - pts[i][1];
                let l = (ex * ex + ey * ey).sqrt();
                let l3 = l * l * l;

                let df2 = -ex * grad[j][0] - ey * grad[j][1];
                let rhs = 6.0 * (values[i] - values[j]) - 2.0 * df2;

                q[0] += 4.0 * ex * ex / l3;
                q[1] += 4.0 * ex * ey / l3;
                q[2] += 4.0 * ey * ey / l3;
                s[0] += rhs * ex / l3;
                s[1] += rhs * ey / l3;
            }

            let det = q[0] * q[2] - q[1] * q[1];
            if det.abs() < f64::MIN_POSITIVE {
                continue;
            }
            let r0 = (q[2] * s[0] - q[1] * s[1]) / det;
            let r1 = (-q[1] * s[0] + q[0] * s[1]) / det;

            let change = (grad[i][0] + r0).abs().max((grad[i][1] + r1).abs());
            grad[i] = [-r0, -r1];

            let relative = change / r0.abs().max(r1.abs()).max(1.0);
            err = err.max(relative);
        }

        if err < tolerance {
            debug!(sweeps = sweep + 1, "gradient estimation converged");
            return grad;
        }
    }

    debug!(
        max_iterations,
        "gradient estimation reached sweep cap; using last estimate"
    );
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scattered_sites() -> Vec<[f64; 2]> {
        vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.1],
            [0.1, 1.0],
            [1.1, 0.9],
            [2.0, 1.1],
            [0.0, 2.0],
            [0.9, 2.1],
            [2.1, 2.0],
            [0.6, 0.5],
            [1.5, 1.6],
        ]
    }

    #[test]
    fn test_reproduces_sample_values() {
        let sites = scattered_sites();
        let values: Vec<f64> = sites.iter().map(|p| (p[0] * 1.3).sin() + p[1]).collect();
        let ct = CloughTocher2d::new(&sites, &values).unwrap();
        for (p, v) in sites.iter().zip(&values) {
            let got = ct.interpolate(p[0], p[1]).unwrap();
            assert!((got - v).abs() < 1e-9, "site {p:?}: {got} vs {v}");
        }
    }

    #[test]
    fn test_linear_function_is_exact() {
        let sites = scattered_sites();
        let f = |x: f64, y: f64| 0.3 + 0.05 * x - 0.02 * y;
        let values: Vec<f64> = sites.iter().map(|p| f(p[0], p[1])).collect();
        let ct = CloughTocher2d::new(&sites, &values).unwrap();

        for g in ct.gradients() {
            assert!((g[0] - 0.05).abs() < 1e-4 && (g[1] + 0.02).abs() < 1e-4);
        }
        for &(x, y) in &[(0.5, 0.5), (1.0, 1.0), (1.7, 1.2), (0.3, 1.6)] {
            let got = ct.interpolate(x, y).unwrap();
            assert!((got - f(x, y)).abs() < 1e-5, "({x}, {y}): {got}");
        }
    }

    #[test]
    fn test_quadratic_is_close() {
        let mut sites = Vec::new();
        for i in 0..7 {
            for j in 0..7 {
                let jitter = 0.03 * (((i * 7 + j) % 5) as f64 - 2.0);
                sites.push([i as f64 / 6.0 + jitter, j as f64 / 6.0 - jitter]);
            }
        }
        let f = |x: f64, y: f64| 0.2 + 0.1 * (x - 0.5).powi(2) + 0.05 * x * y;
        let values: Vec<f64> = sites.iter().map(|p| f(p[0], p[1])).collect();
        let ct = CloughTocher2d::new(&sites, &values).unwrap();
        for &(x, y) in &[(0.5, 0.5), (0.3, 0.4), (0.62, 0.71)] {
            let got = ct.interpolate(x, y).unwrap();
            assert!((got - f(x, y)).abs() < 1e-3, "({x}, {y}): {got}");
        }
    }

    #[test]
    fn test_outside_hull_is_none() {
        let sites = scattered_sites();
        let values = vec![0.2; sites.len()];
        let ct = CloughTocher2d::new(&sites, &values).unwrap();
        assert!(ct.interpolate(-0.5, 1.0).is_none());
        assert!(ct.interpolate(1.0, 2.5).is_none());
        let inside = ct.interpolate(1.0, 1.0).unwrap();
        assert!((inside - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let sites = scattered_sites();
        assert!(CloughTocher2d::new(&sites, &[0.1, 0.2]).is_err());
    }
}

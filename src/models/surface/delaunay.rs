//! Delaunay triangulation of scattered 2-D sample sites.
//!
//! Incremental Bowyer-Watson insertion inside an enclosing super-triangle, run on an
//! isotropically normalised copy of the sites (a similarity transform, so the
//! triangulation is unchanged). Triangles touching the super-triangle are discarded and
//! any reflex vertices left on the boundary are filled so that the triangulated region
//! is the convex hull of the sites. All public coordinates are the caller's.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, SurfaceError};

/// Half-width of the super-triangle, in normalised units.
const SUPER_SCALE: f64 = 1.0e3;

/// Barycentric slack when deciding whether a point lies inside a triangle.
const LOCATE_EPS: f64 = 1.0e-10;

/// Orientation threshold below which three normalised sites count as collinear.
const COLLINEAR_EPS: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy)]
struct Circumcircle {
    cx: f64,
    cy: f64,
    r2: f64,
}

fn circumcircle(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Option<Circumcircle> {
    let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
    if d.abs() < f64::EPSILON {
        return None;
    }
    let a2 = a[0] * a[0] + a[1] * a[1];
    let b2 = b[0] * b[0] + b[1] * b[1];
    let c2 = c[0] * c[0] + c[1] * c[1];
    let cx = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d;
    let cy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d;
    let r2 = (a[0] - cx).powi(2) + (a[1] - cy).powi(2);
    Some(Circumcircle { cx, cy, r2 })
}

/// Twice the signed area of (a, b, c); positive when counter-clockwise.
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Triangulated sample sites.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<[f64; 2]>,
    /// Vertex indices, counter-clockwise.
    triangles: Vec<[usize; 3]>,
    /// `neighbors[t][k]` is the triangle across the edge opposite vertex `k`.
    neighbors: Vec<[Option<usize>; 3]>,
}

impl Triangulation {
    /// Triangulates distinct sites. Fails when fewer than three sites are given or
    /// when all of them are collinear.
    pub fn new(points: &[[f64; 2]]) -> Result<Self> {
        if points.len() < 3 {
            return Err(SurfaceError::insufficient_data(format!(
                "triangulation needs at least 3 sites, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
            return Err(SurfaceError::insufficient_data(
                "triangulation sites must be finite",
            ));
        }

        let normalised = normalise(points);
        if !has_three_non_collinear(&normalised) {
            return Err(SurfaceError::insufficient_data(
                "all sample sites are collinear",
            ));
        }

        let mut triangles = bowyer_watson(&normalised);
        fill_reflex_boundary(&normalised, &mut triangles);

        if triangles.is_empty() {
            return Err(SurfaceError::insufficient_data(
                "triangulation produced no triangles",
            ));
        }

        let neighbors = build_neighbors(&triangles);
        Ok(Self {
            points: points.to_vec(),
            triangles,
            neighbors,
        })
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn neighbors(&self) -> &[[Option<usize>; 3]] {
        &self.neighbors
    }

    /// Barycentric coordinates of `p` with respect to triangle `tri`. Valid for points
    /// outside the triangle as well.
    pub fn barycentric(&self, tri: usize, p: [f64; 2]) -> [f64; 3] {
        let [i0, i1, i2] = self.triangles[tri];
        let (a, b, c) = (self.points[i0], self.points[i1], self.points[i2]);
        let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
        let l0 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / det;
        let l1 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / det;
        [l0, l1, 1.0 - l0 - l1]
    }

    /// Finds a triangle containing `p`, returning it with `p`'s barycentric
    /// coordinates. `None` means `p` lies outside the convex hull.
    pub fn locate(&self, p: [f64; 2]) -> Option<(usize, [f64; 3])> {
        (0..self.triangles.len()).find_map(|tri| {
            let bary = self.barycentric(tri, p);
            bary.iter()
                .all(|&l| l >= -LOCATE_EPS)
                .then_some((tri, bary))
        })
    }

    /// Sorted list of the sites sharing an edge with each site.
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut adjacency: Vec<HashSet<usize>> = vec![HashSet::new(); self.points.len()];
        for tri in &self.triangles {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                adjacency[a].insert(b);
                adjacency[b].insert(a);
            }
        }
        adjacency
            .into_iter()
            .map(|set| {
                let mut v: Vec<usize> = set.into_iter().collect();
                v.sort_unstable();
                v
            })
            .collect()
    }
}

/// Maps sites into the unit box using one scale for both axes.
fn normalise(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    let scale = (max_x - min_x).max(max_y - min_y);
    let scale = if scale > 0.0 { scale } else { 1.0 };
    points
        .iter()
        .map(|p| [(p[0] - min_x) / scale, (p[1] - min_y) / scale])
        .collect()
}

fn has_three_non_collinear(points: &[[f64; 2]]) -> bool {
    let a = points[0];
    let Some(b) = points.iter().copied().find(|&q| q != a) else {
        return false;
    };
    points
        .iter()
        .any(|&c| orient(a, b, c).abs() > COLLINEAR_EPS)
}

fn bowyer_watson(points: &[[f64; 2]]) -> Vec<[usize; 3]> {
    let n = points.len();
    let mut vertices = points.to_vec();
    vertices.push([-SUPER_SCALE, -SUPER_SCALE]);
    vertices.push([SUPER_SCALE, -SUPER_SCALE]);
    vertices.push([0.5, SUPER_SCALE]);

    let mut tris: Vec<([usize; 3], Option<Circumcircle>)> = Vec::new();
    let super_tri = [n, n + 1, n + 2];
    tris.push((
        super_tri,
        circumcircle(vertices[n], vertices[n + 1], vertices[n + 2]),
    ));

    for (i, &p) in points.iter().enumerate() {
        let mut bad = vec![false; tris.len()];
        for (t, (_, cc)) in tris.iter().enumerate() {
            bad[t] = match cc {
                Some(cc) => (p[0] - cc.cx).powi(2) + (p[1] - cc.cy).powi(2) < cc.r2,
                // Zero-area slivers are dropped after insertion.
                None => false,
            };
        }

        // Cavity boundary: directed edges of bad triangles whose reverse is not
        // also an edge of a bad triangle.
        let mut cavity_edges: Vec<(usize, usize)> = Vec::new();
        let mut bad_edges: HashSet<(usize, usize)> = HashSet::new();
        for (t, (tri, _)) in tris.iter().enumerate() {
            if bad[t] {
                for k in 0..3 {
                    bad_edges.insert((tri[k], tri[(k + 1) % 3]));
                }
            }
        }
        for (t, (tri, _)) in tris.iter().enumerate() {
            if bad[t] {
                for k in 0..3 {
                    let (a, b) = (tri[k], tri[(k + 1) % 3]);
                    if !bad_edges.contains(&(b, a)) {
                        cavity_edges.push((a, b));
                    }
                }
            }
        }

        tris = tris
            .into_iter()
            .zip(bad)
            .filter_map(|(tri, is_bad)| (!is_bad).then_some(tri))
            .collect();

        for (a, b) in cavity_edges {
            let tri = [a, b, i];
            let cc = circumcircle(vertices[a], vertices[b], vertices[i]);
            tris.push((tri, cc));
        }
    }

    tris.into_iter()
        .map(|(tri, _)| tri)
        .filter(|tri| tri.iter().all(|&v| v < n))
        .filter(|tri| orient(points[tri[0]], points[tri[1]], points[tri[2]]) > COLLINEAR_EPS)
        .collect()
}

/// Adds ear triangles at reflex boundary vertices until the boundary is convex.
fn fill_reflex_boundary(points: &[[f64; 2]], triangles: &mut Vec<[usize; 3]>) {
    loop {
        let edges: HashSet<(usize, usize)> = triangles
            .iter()
            .flat_map(|tri| (0..3).map(move |k| (tri[k], tri[(k + 1) % 3])))
            .collect();
        let mut next: HashMap<usize, usize> = HashMap::new();
        let mut prev: HashMap<usize, usize> = HashMap::new();
        for &(a, b) in &edges {
            if !edges.contains(&(b, a)) {
                next.insert(a, b);
                prev.insert(b, a);
            }
        }

        let mut boundary: Vec<usize> = next.keys().copied().collect();
        boundary.sort_unstable();

        let ear = boundary.into_iter().find_map(|b| {
            let a = *prev.get(&b)?;
            let c = *next.get(&b)?;
            (a != c && orient(points[a], points[b], points[c]) < -COLLINEAR_EPS)
                .then_some([a, c, b])
        });

        match ear {
            Some(tri) => triangles.push(tri),
            None => break,
        }
    }
}

fn build_neighbors(triangles: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
    let mut edge_owner: HashMap<(usize, usize), usize> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            edge_owner.insert((tri[k], tri[(k + 1) % 3]), t);
        }
    }
    triangles
        .iter()
        .map(|tri| {
            let mut nb = [None; 3];
            for (k, slot) in nb.iter_mut().enumerate() {
                // Edge opposite vertex k runs tri[k+1] -> tri[k+2].
                let a = tri[(k + 1) % 3];
                let b = tri[(k + 2) % 3];
                *slot = edge_owner.get(&(b, a)).copied();
            }
            nb
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    #[test]
    fn test_square_gives_two_triangles() {
        let tri = Triangulation::new(&unit_square()).unwrap();
        assert_eq!(tri.triangles().len(), 2);
        for t in tri.triangles() {
            let [a, b, c] = *t;
            assert!(orient(tri.points()[a], tri.points()[b], tri.points()[c]) > 0.0);
        }
        let shared: usize = tri
            .neighbors()
            .iter()
            .map(|nb| nb.iter().filter(|n| n.is_some()).count())
            .sum();
        assert_eq!(shared, 2);
    }

    #[test]
    fn test_collinear_sites_rejected() {
        let pts = vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(matches!(
            Triangulation::new(&pts),
            Err(SurfaceError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_too_few_sites_rejected() {
        assert!(Triangulation::new(&[[0.0, 0.0], [1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_locate_inside_and_outside() {
        let tri = Triangulation::new(&unit_square()).unwrap();
        let (t, bary) = tri.locate([0.25, 0.5]).unwrap();
        assert!(t < 2);
        assert!((bary.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(tri.locate([1.0, 1.0]).is_some());
        assert!(tri.locate([1.5, 0.5]).is_none());
        assert!(tri.locate([-0.01, 0.5]).is_none());
    }

    #[test]
    fn test_grid_covers_convex_hull() {
        // Regular grid with anisotropic spacing and many cocircular quadruples.
        let mut pts = Vec::new();
        for i in 0..6 {
            for j in 0..4 {
                pts.push([100.0 + 5.0 * i as f64, 3.0 + 7.0 * j as f64]);
            }
        }
        let tri = Triangulation::new(&pts).unwrap();
        // A convex grid of 24 points (20 interior-or-edge) triangulates into
        // 2 * (5 * 3) triangles.
        assert_eq!(tri.triangles().len(), 30);
        let area: f64 = tri
            .triangles()
            .iter()
            .map(|t| 0.5 * orient(pts[t[0]], pts[t[1]], pts[t[2]]))
            .sum();
        assert!((area - 25.0 * 21.0).abs() < 1e-6, "area = {area}");
    }

    #[test]
    fn test_vertex_neighbors_symmetric() {
        let pts = vec![[0.0, 0.0], [2.0, 0.0], [1.0, 2.0], [1.0, 0.7], [3.0, 2.5]];
        let tri = Triangulation::new(&pts).unwrap();
        let adj = tri.vertex_neighbors();
        for (i, list) in adj.iter().enumerate() {
            assert!(!list.is_empty());
            for &j in list {
                assert!(adj[j].contains(&i));
            }
        }
    }
}

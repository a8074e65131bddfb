//! core/density.rs — 2-D histogram surface for one parameter pair and its
//! spline interpolation at every sample.
//!
//! The interpolated value is a deterministic proxy for local point density.
//! It only drives colouring and draw order of scatter points.

use tracing::debug;

use crate::core::spline::GridSpline;
use crate::error::{AnalysisError, Result};

/// Density assigned to samples outside the interpolation support.
pub const DEFAULT_FALLBACK_DENSITY: f64 = 1e-10;

/// Histogram over `x_edges × y_edges`; `values` is row-major by x bin.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityGrid {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    values: Vec<f64>,
    normalized: bool,
}

impl DensityGrid {
    /// Empty grid; edges must be finite, strictly increasing, at least 2 long.
    pub fn new(x_edges: Vec<f64>, y_edges: Vec<f64>) -> Result<Self> {
        check_edges(&x_edges, "x edges")?;
        check_edges(&y_edges, "y edges")?;
        let n = (x_edges.len() - 1) * (y_edges.len() - 1);
        Ok(Self {
            x_edges,
            y_edges,
            values: vec![0.0; n],
            normalized: false,
        })
    }

    /// Bin `points` (numpy rules: half-open bins, last bin closed, points
    /// outside the edges ignored). `density` divides by count × bin area.
    pub fn histogram(
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        points: &[(f64, f64)],
        density: bool,
    ) -> Result<Self> {
        let mut grid = Self::new(x_edges, y_edges)?;
        let ny = grid.y_bins();
        let mut in_range = 0usize;
        for &(x, y) in points {
            let (Some(ix), Some(iy)) = (bin_index(&grid.x_edges, x), bin_index(&grid.y_edges, y))
            else {
                continue;
            };
            grid.values[ix * ny + iy] += 1.0;
            in_range += 1;
        }
        if density && in_range > 0 {
            let total = in_range as f64;
            for ix in 0..grid.x_bins() {
                let dx = grid.x_edges[ix + 1] - grid.x_edges[ix];
                for iy in 0..ny {
                    let dy = grid.y_edges[iy + 1] - grid.y_edges[iy];
                    grid.values[ix * ny + iy] /= total * dx * dy;
                }
            }
            grid.normalized = true;
        }
        Ok(grid)
    }

    #[inline]
    pub fn x_bins(&self) -> usize {
        self.x_edges.len() - 1
    }

    #[inline]
    pub fn y_bins(&self) -> usize {
        self.y_edges.len() - 1
    }

    pub fn x_edges(&self) -> &[f64] {
        &self.x_edges
    }

    pub fn y_edges(&self) -> &[f64] {
        &self.y_edges
    }

    #[inline]
    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.values[ix * self.y_bins() + iy]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// True when values are a probability density rather than counts.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn x_centers(&self) -> Vec<f64> {
        centers(&self.x_edges)
    }

    pub fn y_centers(&self) -> Vec<f64> {
        centers(&self.y_edges)
    }

    /// Σ value · bin area; 1 for a normalized grid with in-range samples.
    pub fn integral(&self) -> f64 {
        let ny = self.y_bins();
        let mut sum = 0.0;
        for ix in 0..self.x_bins() {
            let dx = self.x_edges[ix + 1] - self.x_edges[ix];
            for iy in 0..ny {
                let dy = self.y_edges[iy + 1] - self.y_edges[iy];
                sum += self.values[ix * ny + iy] * dx * dy;
            }
        }
        sum
    }

    /// Spline through the bin centres.
    pub fn surface(&self) -> GridSpline {
        GridSpline::new(&self.x_centers(), &self.y_centers(), &self.values)
    }
}

fn check_edges(edges: &[f64], what: &str) -> Result<()> {
    if edges.len() < 2 {
        return Err(AnalysisError::collapse(
            what,
            format!("{} distinct edge(s), need at least 2", edges.len()),
        ));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(AnalysisError::NumericalDomain(format!(
            "{what} contain non-finite values"
        )));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(AnalysisError::collapse(
            what,
            "edges are not strictly increasing; deduplicate before binning",
        ));
    }
    Ok(())
}

fn bin_index(edges: &[f64], v: f64) -> Option<usize> {
    let last = edges.len() - 1;
    if !(v >= edges[0] && v <= edges[last]) {
        return None;
    }
    if v == edges[last] {
        return Some(last - 1);
    }
    Some(edges.partition_point(|&e| e <= v) - 1)
}

fn centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
}

/// 1-D histogram over `edges` with the same bin rules as [`DensityGrid`];
/// NaN and out-of-range values are not counted.
pub fn marginal_histogram(values: &[f64], edges: &[f64], density: bool) -> Result<Vec<f64>> {
    check_edges(edges, "marginal edges")?;
    let mut counts = vec![0.0; edges.len() - 1];
    let mut in_range = 0usize;
    for &v in values {
        if let Some(i) = bin_index(edges, v) {
            counts[i] += 1.0;
            in_range += 1;
        }
    }
    if density && in_range > 0 {
        let total = in_range as f64;
        for (i, c) in counts.iter_mut().enumerate() {
            *c /= total * (edges[i + 1] - edges[i]);
        }
    }
    Ok(counts)
}

/// Pair up coordinates, dropping any pair with a NaN on either side.
pub fn surviving_pairs(x: &[f64], y: &[f64]) -> Result<Vec<(f64, f64)>> {
    if x.len() != y.len() {
        return Err(AnalysisError::alignment("x/y coordinates", x.len(), y.len()));
    }
    Ok(x.iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect())
}

/// Histogram and per-point interpolated densities for one parameter pair.
#[derive(Clone, Debug)]
pub struct DensityEstimate {
    pub grid: DensityGrid,
    /// Surviving (non-NaN) pairs in input order.
    pub points: Vec<(f64, f64)>,
    /// `point_densities[i]` belongs to `points[i]`.
    pub point_densities: Vec<f64>,
}

impl DensityEstimate {
    /// Indices of `points` sorted by ascending density (stable on ties).
    pub fn draw_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.points.len()).collect();
        order.sort_by(|&a, &b| {
            self.point_densities[a].total_cmp(&self.point_densities[b])
        });
        order
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityGridEstimator {
    /// Normalize the histogram to unit volume instead of raw counts.
    pub density: bool,
    /// Value for samples outside the bin-centre rectangle.
    pub fallback: f64,
}

impl Default for DensityGridEstimator {
    fn default() -> Self {
        Self {
            density: true,
            fallback: DEFAULT_FALLBACK_DENSITY,
        }
    }
}

impl DensityGridEstimator {
    pub fn new(density: bool, fallback: f64) -> Self {
        Self { density, fallback }
    }

    pub fn estimate(
        &self,
        x: &[f64],
        y: &[f64],
        x_edges: &[f64],
        y_edges: &[f64],
    ) -> Result<DensityEstimate> {
        let points = surviving_pairs(x, y)?;
        let grid = DensityGrid::histogram(
            x_edges.to_vec(),
            y_edges.to_vec(),
            &points,
            self.density,
        )?;
        let surface = grid.surface();
        let point_densities: Vec<f64> = points
            .iter()
            .map(|&(px, py)| surface.eval(px, py).unwrap_or(self.fallback))
            .collect();
        debug!(
            input = x.len(),
            surviving = points.len(),
            x_bins = grid.x_bins(),
            y_bins = grid.y_bins(),
            "density grid estimated"
        );
        Ok(DensityEstimate {
            grid,
            points,
            point_densities,
        })
    }
}

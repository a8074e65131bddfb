//! core/spline.rs — Natural cubic splines in 1-D and their tensor product on
//! a rectilinear grid.
//!
//! Used to sample a histogram surface at arbitrary points. Evaluation outside
//! the knot range returns `None` in 2-D; the 1-D spline extrapolates its end
//! segments and is only called inside the range.

/// Interpolating natural cubic spline (zero curvature at both ends).
#[derive(Clone, Debug)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second: Vec<f64>,
}

impl CubicSpline {
    /// `xs` must be strictly increasing and the same length as `ys`.
    pub fn new(xs: &[f64], ys: &[f64]) -> Self {
        assert_eq!(xs.len(), ys.len(), "spline knots and values differ in length");
        assert!(!xs.is_empty(), "spline needs at least one knot");
        debug_assert!(xs.windows(2).all(|w| w[0] < w[1]), "knots must increase");
        Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second: natural_second_derivatives(xs, ys),
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }
        let i = self
            .xs
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
            .min(n - 2);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let h = x1 - x0;
        let a = (x1 - x) / h;
        let b = (x - x0) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.second[i] + (b * b * b - b) * self.second[i + 1]) * h * h
                / 6.0
    }
}

/// Thomas-algorithm solve for the knot second derivatives, natural ends.
fn natural_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        let sub = h0;
        let diag = 2.0 * (h0 + h1);
        let sup = h1;
        let rhs = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
        let denom = diag - sub * c_prime[i - 1];
        c_prime[i] = sup / denom;
        d_prime[i] = (rhs - sub * d_prime[i - 1]) / denom;
    }
    for i in (1..n - 1).rev() {
        m[i] = d_prime[i] - c_prime[i] * m[i + 1];
    }
    m
}

/// Tensor-product natural cubic spline over `values[ix][iy]` at knots
/// `xs × ys`.
#[derive(Clone, Debug)]
pub struct GridSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    columns: Vec<CubicSpline>,
}

impl GridSpline {
    /// `values` is row-major with `xs.len()` rows of `ys.len()` entries.
    pub fn new(xs: &[f64], ys: &[f64], values: &[f64]) -> Self {
        assert_eq!(values.len(), xs.len() * ys.len(), "grid shape mismatch");
        let columns = values
            .chunks(ys.len())
            .map(|row| CubicSpline::new(ys, row))
            .collect();
        Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            columns,
        }
    }

    /// Whether `(x, y)` lies inside the knot rectangle (bounds inclusive).
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (x0, x1) = (self.xs[0], self.xs[self.xs.len() - 1]);
        let (y0, y1) = (self.ys[0], self.ys[self.ys.len() - 1]);
        x >= x0 && x <= x1 && y >= y0 && y <= y1
    }

    pub fn eval(&self, x: f64, y: f64) -> Option<f64> {
        if !self.contains(x, y) {
            return None;
        }
        let along_y: Vec<f64> = self.columns.iter().map(|s| s.eval(y)).collect();
        Some(CubicSpline::new(&self.xs, &along_y).eval(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn spline_passes_through_knots() {
        let xs = [0.0, 1.0, 2.5, 4.0, 5.0];
        let ys = [1.0, -2.0, 0.5, 3.0, 2.0];
        let s = CubicSpline::new(&xs, &ys);
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_abs_diff_eq!(s.eval(*x), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn spline_reproduces_lines() {
        let xs = [0.0, 0.5, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 1.0).collect();
        let s = CubicSpline::new(&xs, &ys);
        for &x in &[0.1, 0.75, 1.9, 2.6] {
            assert_abs_diff_eq!(s.eval(x), 3.0 * x - 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn short_splines_degrade_to_constant_and_linear() {
        let one = CubicSpline::new(&[2.0], &[7.0]);
        assert_eq!(one.eval(-10.0), 7.0);
        let two = CubicSpline::new(&[0.0, 2.0], &[1.0, 5.0]);
        assert_abs_diff_eq!(two.eval(0.5), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn grid_spline_is_exact_on_bilinear_surface() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 2.0, 4.0];
        let f = |x: f64, y: f64| 1.0 + 2.0 * x - y + 0.5 * x * y;
        let mut values = Vec::new();
        for &x in &xs {
            for &y in &ys {
                values.push(f(x, y));
            }
        }
        let g = GridSpline::new(&xs, &ys, &values);
        for &(x, y) in &[(0.5, 1.0), (2.2, 3.7), (3.0, 4.0), (0.0, 0.0)] {
            assert_abs_diff_eq!(g.eval(x, y).unwrap(), f(x, y), epsilon = 1e-10);
        }
        assert!(g.eval(-0.1, 1.0).is_none());
        assert!(g.eval(1.0, 4.5).is_none());
    }
}

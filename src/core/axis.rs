//! core/axis.rs — Per-parameter axis resolution: scale, bin edges, limits,
//! interior ticks and their labels.
//!
//! Log axes work on the positive part of the data only. Ticks are the four
//! interior points of a 6-point grid over the observed range, so no label
//! sits on a panel edge.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Number of candidate tick positions before the two end points are dropped.
pub const TICK_CANDIDATES: usize = 6;
/// Relative padding applied to each end of the axis limits.
pub const LIMIT_PADDING: f64 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

impl AxisScale {
    pub fn from_log_flag(is_log: bool) -> Self {
        if is_log { Self::Log } else { Self::Linear }
    }

    /// Map a data value into plotting coordinates (log10 for log axes).
    /// `None` when the value cannot be shown on this axis.
    #[inline]
    pub fn project(self, v: f64) -> Option<f64> {
        match self {
            Self::Linear if v.is_finite() => Some(v),
            Self::Log if v.is_finite() && v > 0.0 => Some(v.log10()),
            _ => None,
        }
    }

    /// `n` points from `lo` to `hi` inclusive, spaced for this scale.
    pub fn spaced(self, lo: f64, hi: f64, n: usize) -> Vec<f64> {
        match self {
            Self::Linear => linspace(lo, hi, n),
            Self::Log => geomspace(lo, hi, n),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

/// Display contract of one axis: scale, limits and labelled ticks.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisSpec {
    pub scale: AxisScale,
    pub limits: (f64, f64),
    pub ticks: Vec<Tick>,
}

/// Everything the density estimator and the layout need for one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedAxis {
    pub scale: AxisScale,
    pub edges: Vec<f64>,
    /// Observed (min, max) over the values representable on this scale.
    pub range: (f64, f64),
    pub limits: (f64, f64),
    pub ticks: Vec<Tick>,
}

impl ResolvedAxis {
    pub fn spec(&self) -> AxisSpec {
        AxisSpec {
            scale: self.scale,
            limits: self.limits,
            ticks: self.ticks.clone(),
        }
    }
}

/// Resolve the axis of one parameter.
pub fn resolve(values: &[f64], is_log: bool, bin_count: usize) -> Result<ResolvedAxis> {
    let scale = AxisScale::from_log_flag(is_log);
    if bin_count < 2 {
        return Err(AnalysisError::collapse(
            "bin edges",
            format!("{bin_count} edge(s) requested, need at least 2"),
        ));
    }
    let (lo, hi) = observed_range(values, scale)?;
    let edges = dedup_edges(scale.spaced(lo, hi, bin_count));
    if edges.len() < 2 {
        return Err(AnalysisError::collapse(
            "bin edges",
            format!("data spans a single value {lo}"),
        ));
    }
    let limits = padded_limits(lo, hi)?;
    let ticks = interior_ticks(lo, hi, scale)
        .into_iter()
        .map(|position| Tick {
            position,
            label: format_tick(position, scale),
        })
        .collect();

    Ok(ResolvedAxis {
        scale,
        edges,
        range: (lo, hi),
        limits,
        ticks,
    })
}

/// (min, max) over finite values; log scale ignores non-positive ones.
pub fn observed_range(values: &[f64], scale: AxisScale) -> Result<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if scale.project(v).is_none() {
            continue;
        }
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        return Err(match scale {
            AxisScale::Log => AnalysisError::NumericalDomain(
                "log axis requested but no positive values are present".to_string(),
            ),
            AxisScale::Linear => AnalysisError::degenerate("finite axis values", 0, 1),
        });
    }
    Ok((lo, hi))
}

pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| lo + step * i as f64).collect();
            out[n - 1] = hi;
            out
        }
    }
}

/// Geometric spacing; both ends must be positive.
pub fn geomspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    debug_assert!(lo > 0.0 && hi > 0.0, "geomspace needs positive bounds");
    let mut out: Vec<f64> = linspace(lo.log10(), hi.log10(), n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect();
    if let Some(first) = out.first_mut() {
        *first = lo;
    }
    if let Some(last) = out.last_mut() {
        *last = hi;
    }
    out
}

/// Sort and drop repeated values so edges are strictly increasing.
pub fn dedup_edges(mut edges: Vec<f64>) -> Vec<f64> {
    edges.retain(|e| !e.is_nan());
    edges.sort_by(f64::total_cmp);
    edges.dedup();
    edges
}

/// The four interior points of a 6-point grid over `[lo, hi]`.
pub fn interior_ticks(lo: f64, hi: f64, scale: AxisScale) -> Vec<f64> {
    let candidates = scale.spaced(lo, hi, TICK_CANDIDATES);
    candidates[1..TICK_CANDIDATES - 1].to_vec()
}

/// Limits padded by 1% away from the data on both ends.
///
/// For positive data this is `[0.99·min, 1.01·max]`; negative bounds are
/// pushed outward as well so the padding never cuts into the data.
pub fn padded_limits(min: f64, max: f64) -> Result<(f64, f64)> {
    if min.is_nan() || max.is_nan() || min >= max {
        return Err(AnalysisError::collapse(
            "axis limits",
            format!("zero-width range [{min}, {max}]"),
        ));
    }
    Ok((
        min - LIMIT_PADDING * min.abs(),
        max + LIMIT_PADDING * max.abs(),
    ))
}

pub fn format_tick(value: f64, scale: AxisScale) -> String {
    match scale {
        AxisScale::Linear => format!("{value:.1}"),
        AxisScale::Log => scientific_label(value),
    }
}

/// `mantissa·10^exponent` with the mantissa in [1, 10) shown as an integer;
/// exponent 0 renders the rounded value alone.
pub fn scientific_label(value: f64) -> String {
    if !(value.is_finite() && value > 0.0) {
        return format!("{value}");
    }
    let exponent = decade_of(value);
    let mantissa = value / 10f64.powi(exponent);
    if exponent == 0 {
        format!("{mantissa:.0}")
    } else {
        format!("{mantissa:.0}·10^{exponent}")
    }
}

/// floor(log10(v)), corrected for log10 rounding right at powers of ten.
fn decade_of(value: f64) -> i32 {
    const REL: f64 = 1e-12;
    let mut exponent = value.log10().floor() as i32;
    if 10f64.powi(exponent) > value * (1.0 + REL) {
        exponent -= 1;
    } else if 10f64.powi(exponent + 1) <= value * (1.0 + REL) {
        exponent += 1;
    }
    exponent
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scientific_label_examples() {
        assert_eq!(scientific_label(1000.0), "1·10^3");
        assert_eq!(scientific_label(1.0), "1");
        assert_eq!(scientific_label(5.3), "5");
        assert_eq!(scientific_label(2.0e-3), "2·10^-3");
        assert_eq!(scientific_label(0.001), "1·10^-3");
        assert_eq!(scientific_label(4.2e5), "4·10^5");
        assert_eq!(scientific_label(9.7e3), "10·10^3");
    }

    #[test]
    fn interior_ticks_drop_both_ends() {
        let lin = interior_ticks(0.0, 5.0, AxisScale::Linear);
        assert_eq!(lin.len(), 4);
        for (got, want) in lin.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }

        let log = interior_ticks(1.0, 1.0e5, AxisScale::Log);
        assert_eq!(log.len(), 4);
        for (got, want) in log.iter().zip([10.0, 100.0, 1000.0, 10000.0]) {
            assert_relative_eq!(*got, want, max_relative = 1e-12);
        }
    }

    #[test]
    fn linear_labels_have_one_decimal() {
        let axis = resolve(&[0.0, 1.0, 5.0, 2.5], false, 10).unwrap();
        let labels: Vec<&str> = axis.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["1.0", "2.0", "3.0", "4.0"]);
        assert_eq!(axis.edges.len(), 10);
        assert_eq!(axis.scale, AxisScale::Linear);
    }

    #[test]
    fn log_axis_ignores_non_positive_values() {
        let axis = resolve(&[-3.0, 0.0, 1.0, 10.0, 100.0], true, 3).unwrap();
        assert_eq!(axis.range, (1.0, 100.0));
        assert_eq!(axis.edges.len(), 3);
        assert_relative_eq!(axis.edges[1], 10.0, max_relative = 1e-12);
        assert_relative_eq!(axis.limits.0, 0.99, epsilon = 1e-12);
    }

    #[test]
    fn log_axis_without_positive_values_fails() {
        let err = resolve(&[-1.0, 0.0, -5.0], true, 10).unwrap_err();
        assert!(matches!(err, AnalysisError::NumericalDomain(_)));
    }

    #[test]
    fn single_valued_data_collapses() {
        let err = resolve(&[2.0, 2.0, 2.0], false, 20).unwrap_err();
        assert!(matches!(err, AnalysisError::BinCollapse { .. }));
    }

    #[test]
    fn nan_values_are_ignored() {
        let axis = resolve(&[f64::NAN, 1.0, 3.0], false, 5).unwrap();
        assert_eq!(axis.range, (1.0, 3.0));
    }

    #[test]
    fn padding_widens_for_any_sign() {
        let (lo, hi) = padded_limits(1.0, 2.0).unwrap();
        assert_relative_eq!(lo, 0.99, epsilon = 1e-12);
        assert_relative_eq!(hi, 2.02, epsilon = 1e-12);
        let (lo, hi) = padded_limits(-10.0, -5.0).unwrap();
        assert_relative_eq!(lo, -10.1, epsilon = 1e-12);
        assert_relative_eq!(hi, -4.95, epsilon = 1e-12);
        let (lo, hi) = padded_limits(-2.0, 3.0).unwrap();
        assert!(lo < -2.0 && hi > 3.0);
        assert!(padded_limits(4.0, 4.0).is_err());
    }

    #[test]
    fn dedup_edges_removes_repeats() {
        let edges = dedup_edges(vec![1.0, 1.0, 2.0, 2.0, 3.0]);
        assert_eq!(edges, vec![1.0, 2.0, 3.0]);
    }
}

//! core/ftest.rs — Variance-ratio (F) significance test between two
//! residual populations.
//!
//! f = max(var_a, var_b) / min(var_a, var_b), df1 follows the numerator.
//! p = 2 · I_x(df2/2, df1/2) with x = df2 / (df2 + df1·f), folded into [0, 1].

use tracing::debug;

use crate::core::special::f_distribution_sf;
use crate::error::{AnalysisError, Result};

/// Standardized residuals ((data − model) / σ) of one hypothesis fit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidualSample {
    values: Vec<f64>,
}

impl ResidualSample {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Concatenate per-instrument residual arrays in channel order.
    pub fn concat_channels(channels: &[&[f64]]) -> Self {
        let total = channels.iter().map(|c| c.len()).sum();
        let mut values = Vec::with_capacity(total);
        for channel in channels {
            values.extend_from_slice(channel);
        }
        Self { values }
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for ResidualSample {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Outcome of one variance-ratio test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TestResult {
    /// Larger variance over smaller, always ≥ 1.
    pub statistic: f64,
    /// Size of the larger-variance sample minus one.
    pub df1: usize,
    /// Size of the smaller-variance sample minus one.
    pub df2: usize,
    /// Two-tailed p-value in [0, 1].
    pub p_value: f64,
}

/// Sample mean and Bessel-corrected variance.
pub fn mean_and_variance(data: &[f64], what: &str) -> Result<(f64, f64)> {
    let n = data.len();
    if n < 2 {
        return Err(AnalysisError::degenerate(what, n, 2));
    }
    if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericalDomain(format!(
            "{what} contains non-finite value {bad}"
        )));
    }
    let mean = data.iter().sum::<f64>() / n as f64;
    let ss: f64 = data.iter().map(|v| (v - mean) * (v - mean)).sum();
    Ok((mean, ss / (n - 1) as f64))
}

/// F-test on two independent samples of possibly different sizes.
pub fn variance_ratio_test(sample_a: &[f64], sample_b: &[f64]) -> Result<TestResult> {
    let (_, var_a) = mean_and_variance(sample_a, "sample A")?;
    let (_, var_b) = mean_and_variance(sample_b, "sample B")?;
    if var_a == 0.0 || var_b == 0.0 {
        return Err(AnalysisError::NumericalDomain(format!(
            "variance ratio undefined for zero variance (var_a={var_a}, var_b={var_b})"
        )));
    }

    let (statistic, df1, df2) = if var_a > var_b {
        (var_a / var_b, sample_a.len() - 1, sample_b.len() - 1)
    } else if var_b > var_a {
        (var_b / var_a, sample_b.len() - 1, sample_a.len() - 1)
    } else {
        (1.0, sample_b.len() - 1, sample_a.len() - 1)
    };

    let p_value = two_tailed_p(statistic, df1 as f64, df2 as f64);
    debug!(statistic, df1, df2, p_value, "variance ratio test");
    Ok(TestResult {
        statistic,
        df1,
        df2,
        p_value,
    })
}

/// Two-tailed probability of observing a ratio at least as extreme as `f`.
pub fn two_tailed_p(f: f64, df1: f64, df2: f64) -> f64 {
    let mut p = 2.0 * f_distribution_sf(f, df1, df2);
    if p > 1.0 {
        p = 2.0 - p;
    }
    p.clamp(0.0, 1.0)
}

/// Compare residuals of the null and alternative fits over the same bins.
///
/// Both fits see identical data bins, so differing lengths mean the caller
/// mixed up datasets; that is rejected before any arithmetic.
pub fn compare_fits(null: &ResidualSample, alternative: &ResidualSample) -> Result<TestResult> {
    if null.len() != alternative.len() {
        return Err(AnalysisError::alignment(
            "null/alternative residuals",
            null.len(),
            alternative.len(),
        ));
    }
    variance_ratio_test(null.as_slice(), alternative.as_slice())
}

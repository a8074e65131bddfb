//! Significance testing and corner plots for simulated spectral-fit trials.
//!
//! `core` holds the numerics (F-test, axes, density grids), `trials` the
//! whitespace tables they read and write, and `plot` the corner figure.

pub mod config;
pub mod core;
pub mod error;
pub mod plot;
pub mod trials;

pub use error::{AnalysisError, Result};

//! Error taxonomy shared by the significance test, the axis/density
//! estimators and the corner plot.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced to the caller. None of them are retried internally:
/// the same input always fails the same way.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Too few observations (variance needs at least two) or too few
    /// parameters to lay out a grid.
    #[error("degenerate input: {what} has {got} elements, need at least {need}")]
    DegenerateInput {
        what: String,
        got: usize,
        need: usize,
    },

    /// Log axis over non-positive data, zero variance, non-finite values.
    #[error("numerical domain error: {0}")]
    NumericalDomain(String),

    /// Bin edges or axis limits collapsed to a single value.
    #[error("bin collapse for {what}: {reason}")]
    BinCollapse { what: String, reason: String },

    /// Paired sequences with different lengths.
    #[error("alignment error: {what} lengths differ ({left} vs {right})")]
    Alignment {
        what: String,
        left: usize,
        right: usize,
    },

    /// A table row does not match the declared schema.
    #[error("schema error at line {line}: {reason}")]
    Schema { line: usize, reason: String },

    #[error("unknown column {0:?}")]
    UnknownColumn(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Drawing backend failure (font lookup, encoder, file write).
    #[error("render error: {0}")]
    Render(String),
}

impl AnalysisError {
    pub fn degenerate(what: impl Into<String>, got: usize, need: usize) -> Self {
        Self::DegenerateInput {
            what: what.into(),
            got,
            need,
        }
    }

    pub fn collapse(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BinCollapse {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Prefix the failing parameter's name onto axis/domain errors.
    pub fn for_parameter(self, name: &str) -> Self {
        match self {
            Self::BinCollapse { what, reason } => Self::BinCollapse {
                what: format!("{name} {what}"),
                reason,
            },
            Self::NumericalDomain(msg) => Self::NumericalDomain(format!("{name}: {msg}")),
            other => other,
        }
    }

    pub fn alignment(what: impl Into<String>, left: usize, right: usize) -> Self {
        Self::Alignment {
            what: what.into(),
            left,
            right,
        }
    }
}

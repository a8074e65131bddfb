//! Whitespace-separated trial tables: declared schemas, parsing, and the
//! append-only results file shared by independent trial processes.
//!
//! A results file is an unordered multiset of completed trials. Every trial
//! appends exactly one line with a single write on a file opened in append
//! mode, so concurrent writers need no lock. Readers take a snapshot and
//! never rely on row order.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};

/// One declared column of a trial table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Display label used on plot axes; defaults to the name.
    #[serde(default)]
    pub label: String,
    /// Plot this parameter on a logarithmic axis.
    #[serde(default)]
    pub log: bool,
}

impl ColumnSpec {
    pub fn new(name: &str, label: &str, log: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            log,
        }
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// Ordered column declaration validated before any row is read.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
    /// Leading columns that are bookkeeping (fit statistic, dof), not plotted.
    skip: usize,
    /// Accept rows with trailing columns beyond the declared ones.
    allow_extra_columns: bool,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>, skip: usize, allow_extra_columns: bool) -> Result<Self> {
        if columns.is_empty() {
            return Err(AnalysisError::Schema {
                line: 0,
                reason: "schema declares no columns".to_string(),
            });
        }
        for (i, col) in columns.iter().enumerate() {
            if col.name.trim().is_empty() || col.name.contains(char::is_whitespace) {
                return Err(AnalysisError::Schema {
                    line: 0,
                    reason: format!("column {i} has an invalid name {:?}", col.name),
                });
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(AnalysisError::Schema {
                    line: 0,
                    reason: format!("duplicate column name {:?}", col.name),
                });
            }
        }
        if skip > columns.len() {
            return Err(AnalysisError::Schema {
                line: 0,
                reason: format!("skip={skip} exceeds {} declared columns", columns.len()),
            });
        }
        Ok(Self {
            columns,
            skip,
            allow_extra_columns,
        })
    }

    /// `f_statistic p_value parameter`, the layout written by the F-test.
    pub fn ftest_results() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("f_statistic", "F", false),
                ColumnSpec::new("p_value", "p", true),
                ColumnSpec::new("parameter", "parameter", false),
            ],
            skip: 0,
            allow_extra_columns: false,
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Columns after the skipped bookkeeping prefix.
    pub fn plotted(&self) -> &[ColumnSpec] {
        &self.columns[self.skip..]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Row-per-trial table of `f64` values matching a schema.
#[derive(Debug, Clone)]
pub struct ParameterTrialTable {
    schema: TableSchema,
    rows: Vec<Vec<f64>>,
}

impl ParameterTrialTable {
    pub fn empty(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Parse whitespace-separated text; blank lines and `#` comments skip.
    pub fn parse(text: &str, schema: &TableSchema) -> Result<Self> {
        let mut table = Self::empty(schema.clone());
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            table.push_line(line, idx + 1)?;
        }
        Ok(table)
    }

    pub fn read(path: &Path, schema: &TableSchema) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let table = Self::parse(&text, schema)?;
        info!(path = %path.display(), rows = table.len(), "read trial table");
        Ok(table)
    }

    fn push_line(&mut self, line: &str, line_no: usize) -> Result<()> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let arity = self.schema.arity();
        let arity_ok = if self.schema.allow_extra_columns {
            tokens.len() >= arity
        } else {
            tokens.len() == arity
        };
        if !arity_ok {
            return Err(AnalysisError::Schema {
                line: line_no,
                reason: format!("expected {arity} columns, found {}", tokens.len()),
            });
        }
        let mut row = Vec::with_capacity(arity);
        for (tok, col) in tokens.iter().take(arity).zip(self.schema.columns()) {
            let v = parse_value(tok).ok_or_else(|| AnalysisError::Schema {
                line: line_no,
                reason: format!("column {:?}: cannot parse {tok:?}", col.name),
            })?;
            row.push(v);
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a row after checking its arity against the schema.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<()> {
        if row.len() != self.schema.arity() {
            return Err(AnalysisError::Schema {
                line: self.rows.len() + 1,
                reason: format!("expected {} values, got {}", self.schema.arity(), row.len()),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn column_at(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[index]).collect()
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| AnalysisError::UnknownColumn(name.to_string()))?;
        Ok(self.column_at(index))
    }
}

/// Accepts `nan`/`inf` spellings alongside ordinary floats.
fn parse_value(token: &str) -> Option<f64> {
    match token.to_ascii_lowercase().as_str() {
        "nan" | "-nan" => Some(f64::NAN),
        _ => token.parse::<f64>().ok(),
    }
}

/// Every numeric token of a residual file, in reading order. Row layout
/// does not matter; `#` comment lines and blank lines skip.
pub fn parse_residuals(text: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for tok in line.split_whitespace() {
            let v = parse_value(tok).ok_or_else(|| AnalysisError::Schema {
                line: idx + 1,
                reason: format!("cannot parse residual {tok:?}"),
            })?;
            values.push(v);
        }
    }
    Ok(values)
}

pub fn read_residuals(path: &Path) -> Result<Vec<f64>> {
    let values = parse_residuals(&fs::read_to_string(path)?)?;
    debug!(path = %path.display(), n = values.len(), "read residuals");
    Ok(values)
}

/// Scientific notation with 6 significant digits after the point.
pub fn format_value(v: f64) -> String {
    format!("{v:.6e}")
}

pub fn format_row(values: &[f64]) -> String {
    let mut line = values
        .iter()
        .map(|&v| format_value(v))
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line
}

/// Append-only results file; see the module docs for the write contract.
#[derive(Debug, Clone)]
pub struct ResultsFile {
    path: PathBuf,
}

impl ResultsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one completed trial as a single line in one write.
    pub fn append(&self, values: &[f64]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let line = format_row(values);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        debug!(path = %self.path.display(), line = line.trim_end(), "appended trial");
        Ok(())
    }

    /// Snapshot of all complete lines currently in the file. A trailing
    /// segment without `\n` belongs to a trial still being written and is
    /// left out.
    pub fn read(&self, schema: &TableSchema) -> Result<ParameterTrialTable> {
        let text = fs::read_to_string(&self.path)?;
        let (complete, partial) = split_complete_lines(&text);
        if !partial.is_empty() {
            debug!(path = %self.path.display(), partial, "ignoring unterminated last line");
        }
        let table = ParameterTrialTable::parse(complete, schema)?;
        info!(path = %self.path.display(), rows = table.len(), "read results file");
        Ok(table)
    }
}

/// Split at the last newline into terminated lines and the unterminated tail.
pub fn split_complete_lines(text: &str) -> (&str, &str) {
    match text.rfind('\n') {
        Some(i) => text.split_at(i + 1),
        None => ("", text),
    }
}

/// Identifying parameters of one analysis; they name every artifact so
/// repeated runs overwrite instead of accumulating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisId {
    pub exposure: String,
    pub index: String,
    pub sigma: String,
}

impl AnalysisId {
    pub fn new(exposure: impl Into<String>, index: impl Into<String>, sigma: impl Into<String>) -> Self {
        Self {
            exposure: exposure.into(),
            index: index.into(),
            sigma: sigma.into(),
        }
    }

    /// `{prefix}_p{index}_t{exposure}_s{sigma}`
    pub fn stem(&self, prefix: &str) -> String {
        format!(
            "{prefix}_p{}_t{}_s{}",
            self.index, self.exposure, self.sigma
        )
    }

    pub fn ftest_results(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.asc", self.stem("simftest")))
    }

    pub fn parameter_table(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.asc", self.stem("simpars")))
    }

    pub fn corner_stem(&self) -> String {
        self.stem("corner")
    }
}

/// Aggregate of an F-test results file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FtestSummary {
    pub trials: usize,
    pub mean_statistic: f64,
    pub median_p: f64,
    pub mean_parameter: f64,
    /// Fraction of trials with p below the significance level.
    pub detection_rate: f64,
}

impl FtestSummary {
    pub fn from_table(table: &ParameterTrialTable, alpha: f64) -> Result<Self> {
        let n = table.len();
        if n == 0 {
            return Err(AnalysisError::degenerate("F-test results", 0, 1));
        }
        let f = table.column("f_statistic")?;
        let mut p = table.column("p_value")?;
        let param = table.column("parameter")?;
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;

        p.sort_by(f64::total_cmp);
        let median_p = if n % 2 == 1 {
            p[n / 2]
        } else {
            0.5 * (p[n / 2 - 1] + p[n / 2])
        };
        let detected = p.iter().filter(|&&v| v < alpha).count();

        Ok(Self {
            trials: n,
            mean_statistic: mean(&f),
            median_p,
            mean_parameter: mean(&param),
            detection_rate: detected as f64 / n as f64,
        })
    }
}

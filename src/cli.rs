use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use fakeit_corner::trials::AnalysisId;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: String,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compare the residuals of two fits and append `f p param` to the results file
    Ftest(FtestArgs),
    /// Draw the corner plot of a parameter trial table
    Corner(CornerArgs),
    /// Summarize an F-test results file
    Summary(SummaryArgs),
}

/// Identifies one analysis; every artifact name is derived from it.
#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Exposure label
    #[arg(long)]
    pub exposure: String,

    /// Spectral index label
    #[arg(long)]
    pub index: String,

    /// Significance label of the simulated feature
    #[arg(long)]
    pub sigma: String,
}

impl IdArgs {
    pub fn id(&self) -> AnalysisId {
        AnalysisId::new(self.exposure.clone(), self.index.clone(), self.sigma.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct FtestArgs {
    #[command(flatten)]
    pub id: IdArgs,

    /// Residuals of the null fit, one file per channel
    #[arg(long, required = true, num_args = 1..)]
    pub null: Vec<PathBuf>,

    /// Residuals of the alternative fit, one file per channel
    #[arg(long, required = true, num_args = 1..)]
    pub alt: Vec<PathBuf>,

    /// Fitted parameter recorded alongside the test result
    #[arg(long, allow_negative_numbers = true)]
    pub param: f64,

    /// Directory holding the results file
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct CornerArgs {
    #[command(flatten)]
    pub id: IdArgs,

    /// Parameter table (defaults to the simpars file for this analysis)
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Directory for the table lookup and the rendered figures
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub id: IdArgs,

    /// Directory holding the results file
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

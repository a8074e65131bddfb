// Entry point: F-test bookkeeping and corner plots for simulated fit trials.
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::{Cli, Command, CornerArgs, FtestArgs, SummaryArgs};
use fakeit_corner::config::AnalysisConfig;
use fakeit_corner::core::ftest::{ResidualSample, compare_fits};
use fakeit_corner::plot::corner::CornerPlotLayout;
use fakeit_corner::trials::{
    FtestSummary, ParameterTrialTable, ResultsFile, TableSchema, read_residuals,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    let cfg = AnalysisConfig::load_or_default(&cli.config);

    match &cli.command {
        Command::Ftest(args) => cmd_ftest(args),
        Command::Corner(args) => cmd_corner(args, &cfg),
        Command::Summary(args) => cmd_summary(args, &cfg),
    }
}

fn read_channels(paths: &[std::path::PathBuf]) -> Result<ResidualSample> {
    let channels = paths
        .iter()
        .map(|p| read_residuals(p).with_context(|| format!("reading residuals {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let slices: Vec<&[f64]> = channels.iter().map(Vec::as_slice).collect();
    Ok(ResidualSample::concat_channels(&slices))
}

fn cmd_ftest(args: &FtestArgs) -> Result<()> {
    let null = read_channels(&args.null)?;
    let alt = read_channels(&args.alt)?;
    let result = compare_fits(&null, &alt).context("variance-ratio test")?;

    let path = args.id.id().ftest_results(&args.out_dir);
    ResultsFile::new(&path)
        .append(&[result.statistic, result.p_value, args.param])
        .with_context(|| format!("appending to {}", path.display()))?;

    info!(
        f = result.statistic,
        p = result.p_value,
        df1 = result.df1,
        df2 = result.df2,
        results = %path.display(),
        "F-test recorded"
    );
    Ok(())
}

fn cmd_corner(args: &CornerArgs, cfg: &AnalysisConfig) -> Result<()> {
    let id = args.id.id();
    let table_path = args
        .table
        .clone()
        .unwrap_or_else(|| id.parameter_table(&args.out_dir));
    let schema = cfg.schema.to_schema().context("invalid [schema] config")?;
    let table = ParameterTrialTable::read(&table_path, &schema)
        .with_context(|| format!("reading {}", table_path.display()))?;

    let layout = CornerPlotLayout::build(&table, schema.plotted(), &cfg.corner)
        .context("building corner layout")?;
    let (png, svg) = layout
        .render(&args.out_dir, &id.corner_stem())
        .context("rendering corner plot")?;

    println!("Saved corner plot to {} and {}", png.display(), svg.display());
    Ok(())
}

fn cmd_summary(args: &SummaryArgs, cfg: &AnalysisConfig) -> Result<()> {
    let path = args.id.id().ftest_results(&args.dir);
    let table = ResultsFile::new(&path)
        .read(&TableSchema::ftest_results())
        .with_context(|| format!("reading {}", path.display()))?;
    let summary = FtestSummary::from_table(&table, cfg.ftest.alpha)?;

    info!(results = %path.display(), alpha = cfg.ftest.alpha, "F-test summary");
    println!("trials          {}", summary.trials);
    println!("mean F          {:.4}", summary.mean_statistic);
    println!("median p        {:.4e}", summary.median_p);
    println!("mean parameter  {:.6e}", summary.mean_parameter);
    println!(
        "detection rate  {:.4} (p < {})",
        summary.detection_rate, cfg.ftest.alpha
    );
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cm_quantify::{MatchPolicy, MetricsTable, QuantifyConfig, QuantifyRequest, Quantifier};

#[derive(Parser, Debug)]
#[command(name = "crack_metrology")]
#[command(about = "Measure crack length, area and width from binary masks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quantify one mask and print the result as JSON.
    #[command(name = "quantify")]
    Quantify(QuantifyArgs),
    /// Quantify several masks in parallel and print a JSON array.
    #[command(name = "batch")]
    Batch(BatchArgs),
    /// Print the column means of a metrics table.
    #[command(name = "summarize")]
    Summarize(SummarizeArgs),
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Physical size of one pixel edge, in millimeters.
    #[arg(long, required = true)]
    pixel_size: f64,
    /// Comma-separated metric names, or `all`.
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<String>,
    /// Comma-separated visual names, or `all`.
    #[arg(long, value_delimiter = ',')]
    visuals: Vec<String>,
    /// JSON file with pipeline settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    visual_dir: Option<PathBuf>,
    #[arg(long, conflicts_with = "no_table")]
    table: Option<PathBuf>,
    #[arg(long)]
    no_table: bool,
    /// Skip unrecognized metric and visual names instead of failing.
    #[arg(long)]
    lenient: bool,
}

#[derive(Args, Debug, Clone)]
struct QuantifyArgs {
    #[arg(long, required = true)]
    mask: PathBuf,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
struct BatchArgs {
    #[arg(long, required = true, num_args = 1..)]
    mask: Vec<PathBuf>,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
struct SummarizeArgs {
    #[arg(long, default_value = "outputs/csv/predicted_metrics.csv")]
    table: PathBuf,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Quantify(args) => run_quantify(args),
        Command::Batch(args) => run_batch(args),
        Command::Summarize(args) => run_summarize(args),
    }
}

fn run_quantify(args: QuantifyArgs) -> Result<ExitCode> {
    let quantifier = Quantifier::new(build_config(&args.common)?);
    let res = quantifier.quantify(&request(&args.mask, &args.common));

    print_json(&res)?;
    Ok(if res.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_batch(args: BatchArgs) -> Result<ExitCode> {
    let quantifier = Quantifier::new(build_config(&args.common)?);
    let reqs: Vec<QuantifyRequest> = args
        .mask
        .iter()
        .map(|mask| request(mask, &args.common))
        .collect();
    let results = quantifier.quantify_batch(&reqs);

    let failed = results.iter().filter(|r| !r.is_success()).count();
    tracing::info!(total = results.len(), failed, "batch finished");

    print_json(&results)?;
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_summarize(args: SummarizeArgs) -> Result<ExitCode> {
    let summary = MetricsTable::new(&args.table)
        .summarize()
        .with_context(|| format!("summarizing {}", args.table.display()))?;

    print_json(&summary)?;
    Ok(ExitCode::SUCCESS)
}

fn build_config(common: &CommonArgs) -> Result<QuantifyConfig> {
    let mut config = match &common.config {
        Some(path) => read_config(path)?,
        None => QuantifyConfig::default(),
    };

    if let Some(dir) = &common.visual_dir {
        config.visual_dir = dir.clone();
    }
    if let Some(table) = &common.table {
        config.metrics_table = Some(table.clone());
    }
    if common.no_table {
        config.metrics_table = None;
    }
    if common.lenient {
        config.match_policy = MatchPolicy::Lenient;
    }

    Ok(config)
}

fn read_config(path: &Path) -> Result<QuantifyConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    QuantifyConfig::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn request(mask: &Path, common: &CommonArgs) -> QuantifyRequest {
    QuantifyRequest::new(mask, common.pixel_size)
        .with_metrics(common.metrics.iter().cloned())
        .with_visuals(common.visuals.iter().cloned())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing json")?;
    println!("{text}");
    Ok(())
}

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use huesort::export::{build_animation, export_records, DirectorySink, ZipSink};
use huesort::report::BatchReport;
use huesort::{
    intake, AnalysisStrategy, AppError, Configuration, ProcessingSupervisor, SortedBatch,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    /// Hue histogram scored by count and chroma
    Histogram,
    /// Center and chroma weighted histogram with neutral detection
    Perceptual,
    /// Largest k-means cluster
    Kmeans,
}

#[derive(Parser)]
#[command(name = "huesort")]
#[command(version, about = "Order images into a smooth color gradient", long_about = None)]
struct Cli {
    /// Image files, or directories to scan one level deep
    #[arg(value_name = "INPUTS", required = true)]
    inputs: Vec<PathBuf>,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dominant color strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Filename template, e.g. "{index:03}_{basename}"
    #[arg(long, value_name = "TEMPLATE")]
    template: Option<String>,

    /// Seed for k-means clustering
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Number of files analyzed concurrently
    #[arg(short = 'j', long, value_name = "N")]
    jobs: Option<usize>,

    /// Write renamed copies into this directory
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Write renamed copies into this zip archive
    #[arg(long, value_name = "FILE")]
    zip: Option<PathBuf>,

    /// Write a looping GIF of the ordered images
    #[arg(long, value_name = "FILE")]
    gif: Option<PathBuf>,

    /// Frame duration for --gif
    #[arg(long, value_name = "MS")]
    frame_duration: Option<u32>,

    /// Print the batch report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Command-line flags take precedence over the loaded configuration.
    fn apply(&self, mut configuration: Configuration) -> Result<Configuration, AppError> {
        if let Some(strategy) = self.strategy {
            configuration.pipeline.strategy = match strategy {
                StrategyArg::Histogram => AnalysisStrategy::default(),
                StrategyArg::Perceptual => AnalysisStrategy::perceptual(),
                StrategyArg::Kmeans => AnalysisStrategy::kmeans(self.seed),
            };
        }
        if let (Some(seed), AnalysisStrategy::ClusterKMeans(params)) =
            (self.seed, &mut configuration.pipeline.strategy)
        {
            params.seed = Some(seed);
        }
        if let Some(template) = &self.template {
            configuration.pipeline.filename_template = template.clone();
        }
        if let Some(jobs) = self.jobs {
            configuration.max_concurrency = jobs;
        }
        if let Some(out) = &self.out {
            configuration.export.output_dir = Some(out.clone());
        }
        if let Some(zip) = &self.zip {
            configuration.export.zip_file = Some(zip.clone());
        }
        if let Some(frame_duration) = self.frame_duration {
            configuration.export.animation.frame_duration_ms = frame_duration;
        }

        configuration.validate()?;
        Ok(configuration)
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("huesort=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn format_table(batch: &SortedBatch) -> String {
    let mut table = String::new();
    for record in batch {
        let _ = match (record.signature(), record.error()) {
            (Some(signature), _) => {
                let hue = signature
                    .hue
                    .map(|h| format!("{:>5.1}", h))
                    .unwrap_or_else(|| "  -  ".to_string());
                writeln!(
                    table,
                    "{}  {:<32} {}",
                    hue,
                    record.assigned_name().unwrap_or_default(),
                    record.original_name()
                )
            }
            (None, error) => writeln!(
                table,
                "error  {:<32} {}",
                record.original_name(),
                error.unwrap_or_default()
            ),
        };
    }
    table
}

async fn write_animation(
    batch: &SortedBatch,
    configuration: &Configuration,
    path: &Path,
) -> Result<(), AppError> {
    let records = batch.records().to_vec();
    let settings = configuration.export.animation.clone();
    let bytes = tokio::task::spawn_blocking(move || build_animation(&records, &settings))
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))??;
    tokio::fs::write(path, bytes).await?;
    info!("Wrote animation to {}", path.display());
    Ok(())
}

async fn write_zip(batch: &SortedBatch, path: &Path) -> Result<(), AppError> {
    let mut sink = ZipSink::new();
    export_records(batch, &mut sink).await?;
    sink.persist(path).await
}

async fn write_directory(batch: &SortedBatch, dir: &Path) -> Result<(), AppError> {
    let mut sink = DirectorySink::create(dir).await?;
    export_records(batch, &mut sink).await?;
    Ok(())
}

/// Run every requested export. A failing export does not stop the others.
async fn run_exports(
    batch: &SortedBatch,
    configuration: &Configuration,
    gif: Option<&Path>,
) -> Vec<AppError> {
    let mut failures = Vec::new();
    if let Some(dir) = &configuration.export.output_dir {
        if let Err(e) = write_directory(batch, dir).await {
            error!("Export to {} failed: {}", dir.display(), e);
            failures.push(e);
        }
    }
    if let Some(path) = &configuration.export.zip_file {
        if let Err(e) = write_zip(batch, path).await {
            error!("Export to {} failed: {}", path.display(), e);
            failures.push(e);
        }
    }
    if let Some(path) = gif {
        if let Err(e) = write_animation(batch, configuration, path).await {
            error!("Export to {} failed: {}", path.display(), e);
            failures.push(e);
        }
    }
    failures
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let configuration = cli.apply(Configuration::load(cli.config.as_deref())?)?;

    let sources = intake::load_sources(&cli.inputs).await?;

    let cancel_token = CancellationToken::new();
    let supervisor = ProcessingSupervisor::new(
        configuration.pipeline.clone(),
        configuration.max_concurrency,
    )?
    .with_cancel_token(cancel_token.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing files already in progress");
            cancel_token.cancel();
        }
    });

    let progress = supervisor.progress();
    let batch = supervisor.process(sources).await;

    let failures = run_exports(&batch, &configuration, cli.gif.as_deref()).await;

    if cli.json {
        let report = BatchReport::new(
            configuration.pipeline.strategy.name(),
            &batch,
            *progress.borrow(),
        );
        println!("{}", report.to_json()?);
    } else {
        print!("{}", format_table(&batch));
    }

    for failure in &failures {
        eprintln!("huesort: {}", failure);
    }
    Ok(if failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("huesort: {}", e);
            ExitCode::FAILURE
        }
    }
}

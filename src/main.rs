//! Raw Noise Characterization CLI
//!
//! Command-line front end for scanning directories of raw files into
//! the catalog, analyzing single frames, and rendering display images.

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use raw_noise::{
    cache::FrameCache,
    catalog::Catalog,
    config::FileConfig,
    frame::RawloaderDecoder,
    ingest::Scanner,
    metadata::StaticMetadata,
    pipeline::{Analyzer, RenderOptions},
    render::ScaleMode,
};

#[derive(Parser)]
#[command(name = "raw-noise", version, about = "Sensor noise characterization for raw camera files")]
struct Cli {
    /// Configuration file (TOML). Defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recursively ingest a directory of raw files into the catalog
    Scan {
        /// Directory to scan
        directory: PathBuf,
    },
    /// Analyze one raw file and print its noise statistics
    Analyze {
        /// Raw file to analyze
        file: PathBuf,
        /// Also scan for outliers at this sigma
        #[arg(long)]
        sigma: Option<f64>,
    },
    /// Render one raw file to an 8-bit PNG
    Render {
        /// Raw file to render
        file: PathBuf,
        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
        /// Scaling mode
        #[arg(long, value_enum, default_value_t = ModeArg::Normalize)]
        mode: ModeArg,
        /// Repair outliers at this sigma before scaling
        #[arg(long)]
        repair: Option<f64>,
        /// Render from the half-size preview decode
        #[arg(long)]
        preview: bool,
    },
    /// Print catalog counts
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Linear,
    Log,
    Normalize,
    Equalize,
}

impl From<ModeArg> for ScaleMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Linear => ScaleMode::Linear,
            ModeArg::Log => ScaleMode::Log,
            ModeArg::Normalize => ScaleMode::Normalize,
            ModeArg::Equalize => ScaleMode::Equalize,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    match cli.command {
        Command::Scan { directory } => scan(&config, &directory),
        Command::Analyze { file, sigma } => analyze(&config, &file, sigma),
        Command::Render {
            file,
            output,
            mode,
            repair,
            preview,
        } => render(&config, &file, &output, mode.into(), repair, preview),
        Command::Stats => stats(&config),
    }
}

fn scan(config: &FileConfig, directory: &std::path::Path) -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::open(&config.database)?;
    let decoder = RawloaderDecoder::new();
    let metadata = StaticMetadata::new();
    let scanner = Scanner::new(&catalog, &decoder, &metadata, config.scan.extensions.clone());

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        warn!("Interrupt received, finishing current file");
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    let summary = scanner.scan(directory, Some(cancel.as_ref()), |progress| {
        info!(
            "[{}] {:?}: {}",
            progress.processed,
            progress.outcome,
            progress.path.display()
        );
    });

    println!(
        "Scan complete: {} added, {} changed, {} skipped, {} errors{}",
        summary.added,
        summary.changed,
        summary.skipped,
        summary.errors,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}

fn analyze(
    config: &FileConfig,
    file: &std::path::Path,
    sigma: Option<f64>,
) -> Result<(), Box<dyn Error>> {
    let analyzer = build_analyzer(config)?;
    let result = analyzer.analyze(file, None)?;

    println!("{}", file.display());
    println!("  dimensions: {} x {}", result.width, result.height);
    println!(
        "  black level: {:.1}, white level: {}",
        result.calibration.black_level,
        result
            .calibration
            .white_level
            .map_or("unknown".to_string(), |w| format!("{w:.1}")),
    );
    println!(
        "  mean: {:.2}, std: {:.2}, min: {}, max: {}",
        result.statistics.mean, result.statistics.std, result.statistics.min, result.statistics.max
    );
    match result.statistics.ev {
        Some(ev) => println!("  ev: {ev:.2}"),
        None => println!("  ev: unavailable (no white level or zero noise)"),
    }

    if let Some(sigma) = sigma {
        let report = analyzer.outliers(file, sigma, None)?;
        println!(
            "  outliers above {:.1} (sigma {:.1}): {} found, {:.2} expected",
            report.threshold,
            report.sigma,
            report.outliers.len(),
            report.expected_count
        );
        for outlier in report.outliers.iter().take(10) {
            println!("    ({}, {}) = {}", outlier.row, outlier.col, outlier.value);
        }
    }
    Ok(())
}

fn render(
    config: &FileConfig,
    file: &std::path::Path,
    output: &std::path::Path,
    mode: ScaleMode,
    repair: Option<f64>,
    preview: bool,
) -> Result<(), Box<dyn Error>> {
    let analyzer = build_analyzer(config)?;
    let image = analyzer.render(
        file,
        RenderOptions {
            mode,
            preview,
            repair_sigma: repair,
        },
        None,
    )?;

    let png = image::GrayImage::from_raw(
        image.width() as u32,
        image.height() as u32,
        image.pixels().to_vec(),
    )
    .ok_or("display buffer size mismatch")?;
    png.save(output)?;

    println!(
        "Wrote {} ({} x {})",
        output.display(),
        image.width(),
        image.height()
    );
    Ok(())
}

fn stats(config: &FileConfig) -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::open(&config.database)?;
    let stats = catalog.stats()?;
    println!("Catalog: {}", config.database.display());
    println!("  images:   {}", stats.images);
    println!("  cameras:  {}", stats.cameras);
    println!("  analyzed: {}", stats.analyzed);
    Ok(())
}

fn build_analyzer(config: &FileConfig) -> Result<Analyzer, Box<dyn Error>> {
    Ok(Analyzer::new(
        Box::new(RawloaderDecoder::new()),
        Box::new(StaticMetadata::new()),
        FrameCache::new(config.cache.frame_capacity, config.cache.thumbnail_capacity)?,
    ))
}

//! sem - SEM image diagnostics CLI
//!
//! Loads SEM frames, builds a backend-selected image and reports or writes
//! its pixels, centred spectrum and histogram.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sem")]
#[command(author, version, about = "SEM image diagnostics")]
#[command(long_about = "
Spectrum and histogram diagnostics for scanning-electron-microscope frames.
Runs on the GPU (wgpu) when one is available, otherwise on the CPU.
Set SEM_BACKEND=cpu to skip the GPU probe.

Examples:
  sem backends                               # Show detected backends
  sem info frame.tif                         # Shape, histogram and spectrum summary
  sem process frame.tif -o out.png --hanning --spectrum fft.png
  sem process frame.tif -o eq.png --equalise --clamp-table --histogram hist.csv
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List compute backends and the selected one
    Backends,

    /// Display image diagnostics
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Apply transforms and write pixels, spectrum and histogram
    #[command(visible_alias = "p")]
    Process(ProcessArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Input image(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Convert colour inputs to luma instead of rejecting them
    #[arg(short, long)]
    grayscale: bool,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ProcessArgs {
    /// Input image
    input: PathBuf,

    /// Output image (pixels, saturated to 8 bits)
    #[arg(short, long)]
    output: PathBuf,

    /// Apply the Hanning window
    #[arg(long)]
    hanning: bool,

    /// Apply histogram equalisation
    #[arg(short, long)]
    equalise: bool,

    /// Cap the equalisation table at 255
    #[arg(long)]
    clamp_table: bool,

    /// Recompute spectrum and histogram after the transforms
    #[arg(short, long)]
    refresh: bool,

    /// Write the log-scaled spectrum image
    #[arg(short, long)]
    spectrum: Option<PathBuf>,

    /// Write the histogram as CSV
    #[arg(long)]
    histogram: Option<PathBuf>,

    /// Convert colour inputs to luma instead of rejecting them
    #[arg(short, long)]
    grayscale: bool,
}

/// Install the tracing subscriber; the guard flushes the log file on drop.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log.as_deref())?;

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Backends => commands::backends::run(cli.verbose),
        Commands::Info(args) => commands::info::run(args, cli.verbose),
        Commands::Process(args) => commands::process::run(args, cli.verbose),
    }
}

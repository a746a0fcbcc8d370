//! linefit command-line interface.
//!
//! Reconstructs muon tracks along a single detector line from event files.
#![allow(clippy::cast_precision_loss, clippy::too_many_lines)]

use clap::{Args, Parser, Subcommand, ValueEnum};

use linefit_algorithms::reduce_hits;
use linefit_core::config::{MediumConstants, ZenithConvention};
use linefit_core::geometry::{DetectorGeometry, Geometry};
use linefit_fit::Reconstructor;
use linefit_io::{
    read_geometry, read_statistics, write_geometry, EventReader, RunConfig, StatisticsFormat,
    StatisticsWriter,
};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    LinefitIo(#[from] linefit_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] linefit_core::Error),

    #[error("Fit error: {0}")]
    Fit(#[from] linefit_fit::FitError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Zenith convention selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Zenith {
    /// 180 - acos(uz): a down-going track has zenith 0
    ArccosComplement,
    /// asin(uz)
    Arcsin,
}

impl From<Zenith> for ZenithConvention {
    fn from(zenith: Zenith) -> Self {
        match zenith {
            Zenith::ArccosComplement => Self::ArccosComplement,
            Zenith::Arcsin => Self::Arcsin,
        }
    }
}

/// Single-line muon track reconstruction.
#[derive(Parser)]
#[command(name = "linefit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by commands that run the reduction or the fit.
#[derive(Args)]
struct RunArgs {
    /// JSON run configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Merge window on one module (ns)
    #[arg(long)]
    time_window: Option<f64>,

    /// Drop hits that did not merge with anything
    #[arg(long)]
    drop_unmerged: bool,

    /// Minimum time over threshold of a merged hit (ns)
    #[arg(long)]
    min_amplitude: Option<f64>,

    /// Coincidence window for adjacent floors (ns)
    #[arg(long)]
    adjacent_window: Option<f64>,

    /// Coincidence window for next-to-adjacent floors (ns)
    #[arg(long)]
    next_adjacent_window: Option<f64>,

    /// Minimum number of selected hits to attempt a fit
    #[arg(long)]
    min_hits: Option<usize>,

    /// Timing resolution (ns)
    #[arg(long)]
    sigma_t: Option<f64>,

    /// Lower bound on the closest-approach distance (m)
    #[arg(long)]
    dc_min: Option<f64>,

    /// Upper bound on the closest-approach distance (m)
    #[arg(long)]
    dc_max: Option<f64>,

    /// Group refractive index of the medium
    #[arg(long)]
    refractive_index: Option<f64>,

    /// Leave out the light-yield term of the score
    #[arg(long)]
    no_light_yield: bool,

    /// Minimizer tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Zenith convention
    #[arg(long, value_enum)]
    zenith: Option<Zenith>,
}

impl RunArgs {
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        let reduction = &mut config.reduction;
        if let Some(window) = self.time_window {
            reduction.time_window = window;
        }
        if self.drop_unmerged {
            reduction.keep_unmerged = false;
        }
        if let Some(threshold) = self.min_amplitude {
            reduction.min_amplitude = threshold;
        }
        if let Some(window) = self.adjacent_window {
            reduction.adjacent_window = window;
        }
        if let Some(window) = self.next_adjacent_window {
            reduction.next_adjacent_window = window;
        }

        let fit = &mut config.fit;
        if let Some(min_hits) = self.min_hits {
            fit.min_hits = min_hits;
        }
        if let Some(sigma_t) = self.sigma_t {
            fit.sigma_t = sigma_t;
        }
        if let Some(dc_min) = self.dc_min {
            fit.dc_min = dc_min;
        }
        if let Some(dc_max) = self.dc_max {
            fit.dc_max = dc_max;
        }
        if let Some(n) = self.refractive_index {
            fit.medium = MediumConstants::new(n, fit.medium.light_speed);
        }
        if self.no_light_yield {
            fit.light_yield = false;
        }
        if let Some(tolerance) = self.tolerance {
            fit.tolerance = tolerance;
        }
        if let Some(zenith) = self.zenith {
            fit.zenith = zenith.into();
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct all events of a file and write run statistics
    Reconstruct {
        /// Detector geometry (JSON)
        #[arg(short, long)]
        geometry: PathBuf,

        /// Input events (JSON Lines)
        #[arg(required = true)]
        events: Vec<PathBuf>,

        /// Output statistics file (.json or .csv)
        #[arg(short, long)]
        output: PathBuf,

        /// Worker threads (default: all cores)
        #[arg(short, long)]
        threads: Option<usize>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Show the hit reduction stages of each event
    Inspect {
        /// Detector geometry (JSON)
        #[arg(short, long)]
        geometry: PathBuf,

        /// Input events (JSON Lines)
        events: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Summarise a statistics file
    Info {
        /// Statistics file written by `reconstruct` (JSON)
        input: PathBuf,
    },

    /// Write the default run configuration
    Config {
        /// Output file
        output: PathBuf,
    },

    /// Write a single vertical line geometry
    Geometry {
        /// Output file
        output: PathBuf,

        /// Line identifier
        #[arg(long, default_value = "1")]
        line: u32,

        /// Number of optical modules
        #[arg(long, default_value = "18")]
        modules: u32,

        /// Sensors per module
        #[arg(long, default_value = "31")]
        sensors: u32,

        /// Height of the lowest module (m)
        #[arg(long, default_value = "40.0")]
        first_height: f64,

        /// Vertical module spacing (m)
        #[arg(long, default_value = "9.0")]
        spacing: f64,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Reconstruct {
            geometry,
            events,
            output,
            threads,
            run,
        } => {
            if let Some(threads) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()?;
            }

            let config = run.resolve()?;
            let geometry = read_geometry(&geometry)?;
            log::info!(
                "geometry: {} sensors on {} line(s)",
                geometry.len(),
                geometry.lines().len()
            );

            let reconstructor = Reconstructor::new(geometry, config.reduction, config.fit)?;
            let start = Instant::now();
            let mut statistics = reconstructor.statistics();

            for path in &events {
                log::info!("reading {}", path.display());
                let file_events = EventReader::open(path)?.read_all()?;
                statistics.merge(reconstructor.process_all(&file_events));
            }

            let format = StatisticsFormat::from_path(&output);
            StatisticsWriter::create(&output)?.write(&statistics, format)?;
            log::info!("wrote {}", output.display());

            let elapsed = start.elapsed();
            println!(
                "Processed {} events from {} file(s) in {:.2}s",
                statistics.processed_events,
                events.len(),
                elapsed.as_secs_f64()
            );
            println!(
                "Fits: {} attempted, {} valid, {} failed, {} skipped, {} rejected",
                statistics.attempted_fits,
                statistics.valid_fits,
                statistics.failed_fits,
                statistics.skipped_events,
                statistics.rejected_events
            );
        }

        Commands::Inspect {
            geometry,
            events,
            run,
        } => {
            let config = run.resolve()?;
            let geometry = read_geometry(&geometry)?;

            println!(
                "{:>8} | {:>6} | {:>6} | {:>6} | {:>6} | {:>11} | {:>8}",
                "event", "raw", "merged", "long", "first", "coincident", "selected"
            );
            println!("{:-<72}", "");
            for event in EventReader::open(&events)? {
                let event = event?;
                let reduced = reduce_hits(&event.hits, &geometry, &config.reduction)?;
                println!(
                    "{:>8} | {:>6} | {:>6} | {:>6} | {:>6} | {:>11} | {:>8}",
                    event.id,
                    event.hits.len(),
                    reduced.merged.len(),
                    reduced.long_tot.len(),
                    reduced.first.len(),
                    reduced.coincident.len(),
                    reduced.selected.len()
                );
            }
        }

        Commands::Info { input } => {
            let statistics = read_statistics(&input)?;
            let constants = statistics.fit_parameters;

            println!("File: {}", input.display());
            println!("Events processed: {}", statistics.processed_events);
            println!("Events skipped: {}", statistics.skipped_events);
            println!("Events rejected: {}", statistics.rejected_events);
            println!("Fits attempted: {}", statistics.attempted_fits);
            println!("Fits valid: {}", statistics.valid_fits);
            println!("Fits failed: {}", statistics.failed_fits);
            if let Some(fraction) = statistics.valid_fraction() {
                println!("Valid fraction: {:.3}", fraction);
            }
            if let Some(median) = statistics.median_angular_error() {
                println!("Median |angular error|: {:.2} deg", median);
            }
            println!(
                "Constants: d0 = {}, d1 = {}, sigma_t = {}",
                constants.d0, constants.d1, constants.sigma_t
            );
            for (name, values) in &statistics.series {
                println!("  {:<18} {} values", name, values.len());
            }
        }

        Commands::Config { output } => {
            RunConfig::default().save(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }

        Commands::Geometry {
            output,
            line,
            modules,
            sensors,
            first_height,
            spacing,
        } => {
            let geometry = DetectorGeometry::vertical_line(
                line,
                (0.0, 0.0),
                modules,
                sensors,
                first_height,
                spacing,
            );
            write_geometry(&output, &geometry)?;
            println!(
                "Wrote line {} with {} sensors to {}",
                line,
                geometry.len(),
                output.display()
            );
        }
    }

    Ok(())
}

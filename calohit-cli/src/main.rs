//! calohit CLI
//!
//! Replays a recorded step stream through the calorimeter stepping engine
//! and writes the resulting hit collections.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use calohit_core::SteppingConfig;
use calohit_io::{GeometryDescription, HitFileWriter, OutputFormat, StepStream};
use calohit_sim::{process_events, EventHits, SteppingMetrics};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::fs::File;
use std::io::BufWriter;
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
    CalohitIo(#[from] calohit_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] calohit_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Calorimeter hit aggregation from recorded simulation steps.
#[derive(Parser)]
#[command(name = "calohit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a step file and write the hit collections
    Process {
        /// Step file (JSON)
        #[arg(short, long)]
        steps: PathBuf,

        /// Geometry file with the volume catalog and numbering tables (JSON)
        #[arg(short, long)]
        geometry: PathBuf,

        /// Stepping configuration (JSON); defaults are used if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path (.csv, .json, anything else is binary)
        #[arg(short, long)]
        output: PathBuf,

        /// Worker threads (defaults to the number of cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Write the run counters to this JSON file
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a step file
    Info {
        /// Step file (JSON)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            steps,
            geometry,
            config,
            output,
            threads,
            metrics,
            verbose,
        } => {
            let config = match config {
                Some(path) => calohit_io::load_config(&path)?,
                None => {
                    let config = SteppingConfig::default();
                    config.validate()?;
                    config
                }
            };
            let geometry = GeometryDescription::load(&geometry)?;
            let schemes = geometry.schemes();

            if verbose {
                eprintln!("Reading: {}", steps.display());
            }
            let stream = StepStream::load(&steps)?;

            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(threads) = threads {
                builder = builder.num_threads(threads);
            }
            let pool = builder.build()?;

            if verbose {
                eprintln!("Volumes: {}", geometry.volumes.len());
                eprintln!("Runs: {}", stream.runs.len());
                eprintln!("Steps: {}", stream.step_count());
                eprintln!("Threads: {}", pool.current_num_threads());
                eprintln!("Time slice: {} ns", config.time_slice_ns);
            }

            let start = Instant::now();
            let mut events: Vec<EventHits> = Vec::new();
            let mut totals = SteppingMetrics::default();
            let mut failed = 0usize;

            for run in &stream.runs {
                info!("processing run {} ({} events)", run.run, run.events.len());
                let result = pool.install(|| {
                    process_events(&config, &schemes, &geometry, run.run, &run.events)
                })?;

                for (event, hits) in run.events.iter().zip(result.events) {
                    match hits {
                        Ok(hits) => events.push(hits),
                        Err(err) => {
                            error!("run {} event {}: {}", run.run, event.event, err);
                            failed += 1;
                        }
                    }
                }
                totals.absorb(&result.metrics);
            }

            let format = OutputFormat::from_path(&output);
            if verbose {
                eprintln!("Writing output to: {} ({:?})", output.display(), format);
            }
            let mut writer = HitFileWriter::create(&output)?;
            writer.write(format, &events)?;

            if let Some(path) = metrics {
                let file = BufWriter::new(File::create(&path)?);
                serde_json::to_writer_pretty(file, &totals)?;
            }

            let elapsed = start.elapsed();
            let hits: usize = events.iter().map(EventHits::total_hits).sum();

            println!(
                "Processed {} events in {:.2}s",
                events.len() + failed,
                elapsed.as_secs_f64()
            );
            println!("Total hits: {}", hits);
            if failed > 0 {
                println!("Aborted events: {}", failed);
            }
            if verbose {
                eprintln!("{}", totals);
            }
        }

        Commands::Info { input } => {
            let stream = StepStream::load(&input)?;
            let summary = stream.summary();

            println!("File: {}", input.display());
            println!("Runs: {}", summary.runs);
            println!("Events: {}", summary.events);
            println!("Steps: {}", summary.steps);
            println!("Total deposit: {:.3} MeV", summary.total_deposit);
            if summary.steps > 0 {
                println!(
                    "Time range: {} - {} ns",
                    summary.time_range.0, summary.time_range.1
                );
            }
            for (volume, count) in &summary.volumes {
                println!("  {:<24} {}", volume, count);
            }
        }
    }

    Ok(())
}

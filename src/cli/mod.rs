//! netsense CLI
//!
//! Commands for training the detector, exporting synthetic datasets,
//! running the live monitor, and inspecting a model artifact.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

use crate::anomaly::{IsolationForestConfig, IsolationForestModel};
use crate::error::{NetsenseError, Result};
use crate::export::{self, ModelStore, DEFAULT_DATASET_PATH, DEFAULT_MODEL_PATH};
use crate::monitor::LiveMonitor;
use crate::traffic::TrafficGenerator;

fn step_ok(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

fn step_alert(msg: &str) {
    println!("  {} {}", "!".red().bold(), msg.red());
}

#[derive(Parser)]
#[command(name = "netsense")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "IoT network-traffic anomaly detection with isolation forests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a detector on synthetic traffic and persist the artifact
    Train {
        /// Training records to synthesize
        #[arg(long, default_value_t = 5000)]
        samples: usize,
        /// Anomalous fraction of the training traffic
        #[arg(long, default_value_t = 0.05)]
        ratio: f64,
        /// Trees in the ensemble
        #[arg(long, default_value_t = 100)]
        estimators: usize,
        /// Records subsampled per tree
        #[arg(long, default_value_t = 256)]
        subsample: usize,
        /// Assumed anomalous fraction for the decision threshold
        #[arg(long, default_value_t = 0.05)]
        contamination: f64,
        /// Random seed for synthesis and training
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Artifact output path
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        output: PathBuf,
    },
    /// Synthesize a traffic dataset and export it as CSV
    Generate {
        /// Records to synthesize
        #[arg(long, default_value_t = 2000)]
        samples: usize,
        /// Anomalous fraction
        #[arg(long, default_value_t = 0.1)]
        ratio: f64,
        /// Random seed; omit for an entropy-seeded draw
        #[arg(long)]
        seed: Option<u64>,
        /// CSV output path
        #[arg(long, default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,
    },
    /// Run the live monitor loop against a trained artifact
    Monitor {
        /// Model artifact path
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        /// Ticks to run; omit to run until interrupted
        #[arg(long)]
        ticks: Option<u64>,
        /// Delay between ticks in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Random seed for the simulated traffic
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print metadata for a model artifact
    Info {
        /// Model artifact path
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
    },
}

/// Train and persist a model
#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    samples: usize,
    ratio: f64,
    estimators: usize,
    subsample: usize,
    contamination: f64,
    seed: u64,
    output: &PathBuf,
) -> Result<()> {
    let start = Instant::now();

    let mut generator = TrafficGenerator::new().with_seed(seed);
    let dataset = generator.generate(samples, ratio)?;
    step_ok(&format!(
        "generated {} training records ({} anomalous)",
        dataset.len(),
        dataset.count_label(crate::traffic::Label::Attack)
    ));

    let config = IsolationForestConfig::new()
        .with_n_estimators(estimators)
        .with_subsample_size(subsample)
        .with_contamination(contamination)
        .with_seed(seed);
    let model = IsolationForestModel::train(&dataset, &config)?;
    step_ok(&format!(
        "trained {} trees (threshold {:.4}, baseline {:.4})",
        model.n_estimators(),
        model.threshold(),
        model.baseline_score().unwrap_or(f64::NAN)
    ));

    let scored = model.score(&dataset)?;
    step_ok(&format!(
        "{} of {} training records over threshold",
        scored.n_anomalous(),
        dataset.len()
    ));

    export::save_model(&model, output)?;
    step_ok(&format!(
        "saved artifact to {} in {:.2}s",
        output.display(),
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Synthesize a dataset and write it as CSV
pub fn cmd_generate(samples: usize, ratio: f64, seed: Option<u64>, output: &PathBuf) -> Result<()> {
    let mut generator = match seed {
        Some(seed) => TrafficGenerator::new().with_seed(seed),
        None => TrafficGenerator::new(),
    };
    let dataset = generator.generate(samples, ratio)?;
    export::write_csv(&dataset, output)?;
    step_ok(&format!(
        "wrote {} records to {}",
        dataset.len(),
        output.display()
    ));
    Ok(())
}

/// Run the live monitor loop
pub fn cmd_monitor(
    model_path: &PathBuf,
    ticks: Option<u64>,
    interval_ms: u64,
    seed: Option<u64>,
) -> Result<()> {
    let store = ModelStore::new();
    let model = store.load(model_path)?;
    step_ok(&format!(
        "loaded model ({} trees, threshold {:.4})",
        model.n_estimators(),
        model.threshold()
    ));

    let generator = match seed {
        Some(seed) => TrafficGenerator::new().with_seed(seed),
        None => TrafficGenerator::new(),
    };
    let mut monitor = LiveMonitor::new(model, generator);

    let mut remaining = ticks;
    loop {
        if let Some(n) = remaining.as_mut() {
            if *n == 0 {
                break;
            }
            *n -= 1;
        }

        match monitor.tick() {
            Ok(tick) => {
                let line = format!(
                    "size {:7.1} B  gap {:8.4} ms  score {:.4}",
                    tick.record.packet_size, tick.record.time_interval, tick.score
                );
                if tick.is_anomalous {
                    step_alert(&format!("{}  ANOMALY", line));
                    if let Some(explanation) = &tick.explanation {
                        for attribution in explanation.top_k(4) {
                            println!(
                                "      {} {:>13} = {:10.2}  contribution {:+.4}",
                                "·".dimmed(),
                                attribution.feature,
                                attribution.value,
                                attribution.contribution
                            );
                        }
                    }
                } else {
                    println!("  {} {}", "·".dimmed(), line.dimmed());
                }
            }
            // A bad tick aborts its own display update, not the loop
            Err(e @ NetsenseError::SchemaMismatch(_))
            | Err(e @ NetsenseError::ExplainUnavailable(_)) => {
                warn!(error = %e, "skipping tick");
            }
            Err(e) => return Err(e),
        }

        if remaining != Some(0) {
            std::thread::sleep(std::time::Duration::from_millis(interval_ms));
        }
    }
    Ok(())
}

/// Print artifact metadata
pub fn cmd_info(model_path: &PathBuf) -> Result<()> {
    let model = export::load_model(model_path)?;
    println!("  artifact       {}", model_path.display());
    println!("  trained at     {}", model.trained_at().to_rfc3339());
    println!("  features       {}", model.schema().names().join(", "));
    println!("  n_estimators   {}", model.n_estimators());
    println!("  subsample_size {}", model.subsample_size());
    println!("  contamination  {}", model.contamination());
    println!("  threshold      {:.6}", model.threshold());
    match model.baseline_score() {
        Some(baseline) => println!("  baseline       {:.6}", baseline),
        None => println!("  baseline       (absent; explanations unavailable)"),
    }
    Ok(())
}

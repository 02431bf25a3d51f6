use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use lorentz_forest::{ForestConfig, StandardScaler};
use lorentz_io::{ArtifactWriter, SampleReader};
use lorentz_synth::{train_test_split, Dataset, GeneratorConfig};

#[derive(Parser)]
#[command(name = "lorentz")]
#[command(about = "Synthetic charged-particle dataset generation and random forest training")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared training parameters.
#[derive(Args, Debug, Clone)]
struct TrainArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 3)]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 2)]
    max_depth: usize,

    /// Fraction of samples held out for testing
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a balanced synthetic dataset and write it to CSV
    Generate {
        /// Number of samples to generate
        #[arg(long, default_value_t = 500)]
        samples: usize,

        /// Output directory for artifact files
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Train a random forest on a labeled CSV dataset
    Train {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Output directory for artifact files
        #[arg(long, default_value = ".")]
        out: PathBuf,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Generate a dataset and train on it in one step
    Run {
        /// Number of samples to generate
        #[arg(long, default_value_t = 500)]
        samples: usize,

        /// Output directory for artifact files
        #[arg(long, default_value = ".")]
        out: PathBuf,

        #[command(flatten)]
        train: TrainArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct GenerateOutput {
    n_samples: usize,
    n_label0: usize,
    n_label1: usize,
    data_path: PathBuf,
}

#[derive(Serialize)]
struct TrainOutput {
    n_train: usize,
    n_test: usize,
    n_trees: usize,
    max_depth: usize,
    train_accuracy: f64,
    test_accuracy: f64,
    model_path: PathBuf,
    scaler_path: PathBuf,
    predictions_path: PathBuf,
}

#[derive(Serialize)]
struct RunOutput {
    generate: GenerateOutput,
    train: TrainOutput,
}

fn generate_stage(samples: usize, out: &Path, seed: u64) -> Result<GenerateOutput> {
    let dataset = GeneratorConfig::new(samples)?.with_seed(seed).generate();
    let (n_label0, n_label1) = dataset.label_counts();

    let writer = ArtifactWriter::new(out)?;
    let data_path = writer
        .write_dataset(&dataset)
        .context("failed to write dataset CSV")?;

    Ok(GenerateOutput {
        n_samples: dataset.len(),
        n_label0,
        n_label1,
        data_path,
    })
}

fn train_stage(dataset: &Dataset, out: &Path, args: &TrainArgs, seed: u64) -> Result<TrainOutput> {
    // 1. Hold out a test partition
    let (train, test) = train_test_split(dataset, args.test_fraction, seed)
        .context("failed to split dataset")?;
    info!(n_train = train.len(), n_test = test.len(), "dataset split");

    // 2. Fit the scaler on training rows only
    let scaler = StandardScaler::fit(&train.feature_matrix()).context("failed to fit scaler")?;
    let train_scaled = scaler.transform(&train.feature_matrix())?;
    let test_scaled = scaler.transform(&test.feature_matrix())?;

    // 3. Train the forest
    let forest = ForestConfig::new(args.trees)?
        .with_max_depth(Some(args.max_depth))
        .with_seed(seed)
        .fit(&train_scaled, &train.labels())
        .context("training failed")?;
    info!(
        n_trees = forest.n_trees(),
        n_features = forest.n_features(),
        "forest trained"
    );

    // 4. Write artifacts
    let writer = ArtifactWriter::new(out)?;
    let params = scaler.params();
    let scaler_path = writer
        .write_scaler(&params.mean, &params.scale)
        .context("failed to write scaler parameters")?;

    let model_path = writer.model_path();
    forest.save(&model_path).context("failed to save model")?;
    info!(path = %model_path.display(), "model saved");

    // 5. Predict the held-out rows and write them with both labels
    let predictions = forest
        .predict_batch(&test_scaled)
        .context("prediction failed")?;
    let predictions_path = writer
        .write_predictions(test.samples(), &predictions)
        .context("failed to write predictions")?;

    let train_predictions = forest.predict_batch(&train_scaled)?;
    let train_accuracy = accuracy(&train_predictions, &train.labels());
    let test_accuracy = accuracy(&predictions, &test.labels());
    info!(train_accuracy, test_accuracy, "evaluation complete");

    Ok(TrainOutput {
        n_train: train.len(),
        n_test: test.len(),
        n_trees: args.trees,
        max_depth: args.max_depth,
        train_accuracy,
        test_accuracy,
        model_path,
        scaler_path,
        predictions_path,
    })
}

fn accuracy(predictions: &[usize], labels: &[usize]) -> f64 {
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|&(p, l)| p == l)
        .count();
    correct as f64 / labels.len() as f64
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Generate { samples, out } => {
            let output = generate_stage(samples, &out, cli.seed)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Train { data, out, train } => {
            let dataset = SampleReader::new(&data)
                .read()
                .context("failed to read input CSV")?;
            info!(n_samples = dataset.len(), "dataset loaded");

            let output = train_stage(&dataset, &out, &train, cli.seed)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Run { samples, out, train } => {
            let generate = generate_stage(samples, &out, cli.seed)?;

            // Re-read from disk so the full pipeline exercises the same
            // path a standalone train run would take.
            let dataset = SampleReader::new(&generate.data_path)
                .read()
                .context("failed to read generated CSV")?;

            let train_output = train_stage(&dataset, &out, &train, cli.seed)?;
            let output = RunOutput {
                generate,
                train: train_output,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

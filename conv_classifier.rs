use anyhow::{Context, Result};
use clap::Parser;
use conv_classifier::config::load_config;
use conv_classifier::data::load_dataset;
use conv_classifier::logging::init_logging;
use conv_classifier::model::ConvClassifier;
use conv_classifier::training::{Trainer, TrainingSchedule};
use std::path::PathBuf;
use tracing::info;

// Train the convolutional classifier on pre-split data, keep the best
// validation checkpoint and report test accuracy, ROC-AUC and F1.
#[derive(Parser, Debug)]
#[command(name = "conv_classifier")]
#[command(about = "Train and evaluate the convolutional classifier with early stopping")]
#[command(version)]
struct Args {
    /// Classifier configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Dataset with train/valid/test splits (JSON)
    #[arg(short, long)]
    data: PathBuf,

    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Directory for the checkpoint, events and exported curves
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let mut config = load_config(&args.config)
        .with_context(|| format!("loading config '{}'", args.config.display()))?;
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }

    let data = load_dataset(&args.data, config.input_dim(), config.num_classes)
        .with_context(|| format!("loading dataset '{}'", args.data.display()))?;
    info!(
        train = data.train.rows(),
        valid = data.valid.rows(),
        test = data.test.rows(),
        "Loaded dataset"
    );

    let classifier = ConvClassifier::new(&config)?;
    let schedule = TrainingSchedule::from_config(&config)?;
    let mut trainer = Trainer::new(classifier, data, schedule)?;
    let report = trainer.train_test()?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

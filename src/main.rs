use bingenie::config::Config;
use bingenie::image_classifier::impl_fake::ImageClassifierFake;
use bingenie::image_classifier::preprocess::Preprocessing;
use bingenie::image_classifier::vocabulary::Vocabulary;
use bingenie::library::logger::impl_console::LoggerConsole;
use bingenie::library::logger::interface::Logger;
use bingenie::sorter::evaluate::evaluate_dir;
use bingenie::sorter::main::{Overrides, WasteSorter};
use bingenie::sorter::shared::SHARED_SORTER;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "bingenie", about = "Sort waste photos into recyclable or not")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "BINGENIE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the model directory from the configuration
    #[arg(long, env = "BINGENIE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify images and print one JSON decision per line
    Classify {
        #[arg(required = true)]
        images: Vec<PathBuf>,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        #[arg(short, long)]
        threshold: Option<f64>,

        /// Use a random fake model instead of loading one
        #[arg(long)]
        fake: bool,
    },
    /// Report accuracy over an image folder laid out as <dir>/<label>/*
    Evaluate {
        dir: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> bingenie::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(model_dir) = &cli.model_dir {
        config.model_dir = model_dir.clone();
    }
    Ok(config)
}

fn fake_sorter(config: &Config) -> bingenie::Result<WasteSorter> {
    let vocabulary = Vocabulary::new(["organic", "recyclable"])?;
    let classifier = ImageClassifierFake::random(vocabulary, Preprocessing::default());
    WasteSorter::new(Arc::new(classifier), config.decision_policy(), config.top_k)
}

fn classify(
    sorter: &WasteSorter,
    images: &[PathBuf],
    overrides: Overrides,
    logger: &Arc<dyn Logger + Send + Sync>,
) -> ExitCode {
    let mut failures = 0;

    for path in images {
        let decision = std::fs::read(path)
            .map_err(bingenie::Error::from)
            .and_then(|bytes| sorter.classify_bytes(&bytes, overrides));

        match decision {
            Ok(decision) => {
                let record = serde_json::json!({
                    "image": path.display().to_string(),
                    "decision": decision,
                });
                println!("{}", record);
            }
            Err(e) => {
                logger.warn(&format!("{}: {}", path.display(), e));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        logger.warn(&format!("{} of {} images failed", failures, images.len()));
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> bingenie::Result<ExitCode> {
    let config = load_config(&cli)?;
    let logger = LoggerConsole::new(config.logger_timezone()?).with_namespace("bingenie");

    match cli.command {
        Command::Classify {
            images,
            top_k,
            threshold,
            fake,
        } => {
            let sorter = if fake {
                logger.info("using a fake model with random scores");
                SHARED_SORTER.get_or_try_init(|| fake_sorter(&config))?
            } else {
                logger.info(&format!("loading model from {}", config.model_dir.display()));
                SHARED_SORTER.get_or_load(&config)?
            };

            Ok(classify(
                sorter,
                &images,
                Overrides { top_k, threshold },
                &logger,
            ))
        }
        Command::Evaluate { dir, json } => {
            logger.info(&format!("loading model from {}", config.model_dir.display()));
            let sorter = SHARED_SORTER.get_or_load(&config)?;
            let report = evaluate_dir(sorter, &dir, logger.clone())?;

            if json {
                let text =
                    serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
                println!("{}", text);
            } else {
                println!("{}", report);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("bingenie: {}", e);
            ExitCode::FAILURE
        }
    }
}

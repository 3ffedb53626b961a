use crate::error::{Error, Result};
use crate::image_classifier::preprocess::decode_image;
use crate::image_classifier::vocabulary::Vocabulary;
use crate::library::logger::interface::Logger;
use crate::sorter::main::WasteSorter;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Rows are the true label, columns the predicted one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub labels: Vec<String>,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub skipped: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ConfusionMatrix {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let size = vocabulary.size();
        Self {
            labels: vocabulary.labels().to_vec(),
            counts: vec![vec![0; size]; size],
        }
    }

    pub fn record(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    pub fn class_metrics(&self, index: usize) -> ClassMetrics {
        let true_positives = self.counts[index][index];
        let support: usize = self.counts[index].iter().sum();
        let predicted: usize = self.counts.iter().map(|row| row[index]).sum();

        let precision = ratio(true_positives, predicted);
        let recall = ratio(true_positives, support);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        ClassMetrics {
            label: self.labels[index].clone(),
            precision,
            recall,
            f1,
            support,
        }
    }

    pub fn report(&self, skipped: usize) -> EvaluationReport {
        EvaluationReport {
            labels: self.labels.clone(),
            confusion_matrix: self.counts.clone(),
            total: self.total(),
            correct: self.correct(),
            accuracy: self.accuracy(),
            classes: (0..self.labels.len())
                .map(|i| self.class_metrics(i))
                .collect(),
            skipped,
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|label| label.len())
            .max()
            .unwrap_or(0)
            .max(10);

        writeln!(f, "Confusion matrix (rows = actual, columns = predicted):")?;
        write!(f, "{:width$}", "", width = width)?;
        for label in &self.labels {
            write!(f, " {:>width$}", label, width = width)?;
        }
        writeln!(f)?;
        for (label, row) in self.labels.iter().zip(&self.confusion_matrix) {
            write!(f, "{:width$}", label, width = width)?;
            for count in row {
                write!(f, " {:>width$}", count, width = width)?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:width$} {:>9} {:>9} {:>9} {:>9}",
            "label",
            "precision",
            "recall",
            "f1",
            "support",
            width = width
        )?;
        for class in &self.classes {
            writeln!(
                f,
                "{:width$} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                class.label,
                class.precision,
                class.recall,
                class.f1,
                class.support,
                width = width
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "accuracy: {:.4} ({}/{})",
            self.accuracy, self.correct, self.total
        )?;
        write!(f, "skipped: {}", self.skipped)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect())
}

/// Scores every image under `<dir>/<label>/` by argmax, without the
/// confidence threshold, and tallies the results per label.
pub fn evaluate_dir(
    sorter: &WasteSorter,
    dir: &Path,
    logger: Arc<dyn Logger + Send + Sync>,
) -> Result<EvaluationReport> {
    let logger = logger.with_namespace("evaluate");
    let vocabulary = sorter.classifier().vocabulary();
    let mut matrix = ConfusionMatrix::new(vocabulary);
    let mut skipped = 0;

    for class_dir in sorted_entries(dir)?.into_iter().filter(|p| p.is_dir()) {
        let name = class_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let files = image_files(&class_dir)?;

        let Some(actual) = vocabulary.position(&name) else {
            logger.warn(&format!(
                "skipping {} images in {:?}: not a model label",
                files.len(),
                name
            ));
            skipped += files.len();
            continue;
        };

        logger.info(&format!("evaluating {} images labelled {:?}", files.len(), name));

        for file in files {
            let scored = std::fs::read(&file)
                .map_err(Error::from)
                .and_then(|bytes| decode_image(&bytes))
                .and_then(|image| sorter.scores(&image));

            match scored {
                Ok(scores) => matrix.record(actual, scores.argmax()),
                Err(e) => {
                    logger.warn(&format!("skipping {}: {}", file.display(), e));
                    skipped += 1;
                }
            }
        }
    }

    Ok(matrix.report(skipped))
}

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Closed, ordered set of labels a loaded model was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
}

/// The part of a Hugging Face `config.json` that names the classes.
#[derive(Debug, Deserialize)]
struct ModelLabels {
    id2label: BTreeMap<String, String>,
}

impl Vocabulary {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::Config("label vocabulary is empty".to_string()));
        }
        if let Some(blank) = labels.iter().position(|label| label.trim().is_empty()) {
            return Err(Error::Config(format!("label {} is blank", blank)));
        }
        Ok(Self { labels })
    }

    /// Builds the vocabulary from an `id2label` table whose keys must be 0..n.
    pub fn from_id2label(id2label: &BTreeMap<String, String>) -> Result<Self> {
        let mut indexed = Vec::with_capacity(id2label.len());
        for (key, label) in id2label {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("id2label key is not an index: {:?}", key)))?;
            indexed.push((index, label.clone()));
        }
        indexed.sort_by_key(|(index, _)| *index);

        for (expected, (index, _)) in indexed.iter().enumerate() {
            if *index != expected {
                return Err(Error::Config(format!(
                    "id2label is missing index {}",
                    expected
                )));
            }
        }

        Self::new(indexed.into_iter().map(|(_, label)| label))
    }

    pub fn from_model_config_json(text: &str) -> Result<Self> {
        let parsed: ModelLabels =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        Self::from_id2label(&parsed.id2label)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_model_config_json(&text)
    }

    pub fn label_for(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    /// Case-insensitive lookup.
    pub fn position(&self, label: &str) -> Option<usize> {
        let wanted = normalize_label(label);
        self.labels
            .iter()
            .position(|candidate| normalize_label(candidate) == wanted)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

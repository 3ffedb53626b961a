use crate::error::{Error, Result};
use crate::sorter::decision::DecisionPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding `model.onnx`, `config.json` and `preprocessor_config.json`.
    pub model_dir: PathBuf,
    pub recycle_label: String,
    pub threshold: f64,
    pub top_k: usize,
    pub logger_utc_offset_hours: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/bingenie_binary_v1"),
            recycle_label: "recyclable".to_string(),
            threshold: 0.60,
            top_k: 2,
            logger_utc_offset_hours: 0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn decision_policy(&self) -> DecisionPolicy {
        DecisionPolicy {
            recycle_label: self.recycle_label.clone(),
            threshold: self.threshold,
        }
    }

    pub fn logger_timezone(&self) -> Result<chrono::FixedOffset> {
        self.logger_utc_offset_hours
            .checked_mul(3600)
            .and_then(chrono::FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::Config(format!(
                    "logger_utc_offset_hours out of range: {}",
                    self.logger_utc_offset_hours
                ))
            })
    }
}

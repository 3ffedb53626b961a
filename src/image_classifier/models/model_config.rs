use std::path::{Path, PathBuf};

/// Locations of the artifacts that make up one exported model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub onnx_model_path: PathBuf,
    pub labels_path: PathBuf,
    pub preprocessor_path: PathBuf,
}

impl ModelConfig {
    /// Layout written by `optimum` / `transformers` exports.
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            onnx_model_path: dir.join("model.onnx"),
            labels_path: dir.join("config.json"),
            preprocessor_path: dir.join("preprocessor_config.json"),
        }
    }
}

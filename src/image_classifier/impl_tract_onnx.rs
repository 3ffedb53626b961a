use crate::error::{Error, Result};
use crate::image_classifier::interface::ImageClassifier;
use crate::image_classifier::models::model_config::ModelConfig;
use crate::image_classifier::preprocess::Preprocessing;
use crate::image_classifier::vocabulary::Vocabulary;
use crate::sorter::score::ScoreVector;
use tract_onnx::prelude::*;

pub struct ImageClassifierTractOnnx {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>,
    vocabulary: Vocabulary,
    preprocessing: Preprocessing,
}

impl ImageClassifierTractOnnx {
    /// Loads and optimizes the model. Expensive; do it once per process.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        if !config.onnx_model_path.is_file() {
            return Err(Error::ModelUnavailable(format!(
                "model file not found: {}",
                config.onnx_model_path.display()
            )));
        }

        let vocabulary = Vocabulary::load(&config.labels_path)?;
        let preprocessing = if config.preprocessor_path.is_file() {
            Preprocessing::load(&config.preprocessor_path)?
        } else {
            Preprocessing::default()
        };

        let input_fact = f32::fact(preprocessing.input_shape());
        let model = tract_onnx::onnx()
            .model_for_path(&config.onnx_model_path)
            .and_then(|model| model.with_input_fact(0, input_fact.into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(Error::model_unavailable)?;

        Ok(Self {
            model,
            vocabulary,
            preprocessing,
        })
    }
}

impl ImageClassifier for ImageClassifierTractOnnx {
    fn classify(&self, input: Tensor) -> Result<ScoreVector> {
        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .map_err(Error::model_unavailable)?;

        let output = outputs
            .first()
            .ok_or_else(|| Error::ModelUnavailable("model produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(Error::model_unavailable)?;

        // logits come as [1, n] or [n]
        let logits: Vec<f32> = match output.shape() {
            [1, _] | [_] => output.iter().copied().collect(),
            shape => {
                return Err(Error::ModelUnavailable(format!(
                    "unexpected output shape {:?}",
                    shape
                )))
            }
        };

        ScoreVector::for_vocabulary(logits, &self.vocabulary)
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn preprocessing(&self) -> &Preprocessing {
        &self.preprocessing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::from_dir(dir.path());

        assert!(matches!(
            ImageClassifierTractOnnx::new(&config),
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_corrupt_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.onnx"), b"not a protobuf").unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"id2label": {"0": "organic", "1": "recyclable"}}"#,
        )
        .unwrap();
        let config = ModelConfig::from_dir(dir.path());

        assert!(matches!(
            ImageClassifierTractOnnx::new(&config),
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_labels_fail_before_model_parse() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.onnx"), b"not a protobuf").unwrap();
        let config = ModelConfig::from_dir(dir.path());

        assert!(matches!(
            ImageClassifierTractOnnx::new(&config),
            Err(Error::Io(_))
        ));
    }
}

use crate::config::Config;
use crate::error::{Error, Result};
use crate::image_classifier::impl_tract_onnx::ImageClassifierTractOnnx;
use crate::image_classifier::interface::ImageClassifier;
use crate::image_classifier::models::model_config::ModelConfig;
use crate::image_classifier::preprocess::{decode_image, normalize_image};
use crate::sorter::decision::{decide, Decision, DecisionPolicy};
use crate::sorter::score::{interpret, ScoreVector};
use image::DynamicImage;
use std::sync::Arc;

/// Per-request knobs. `top_k` is clamped to the vocabulary size and
/// `threshold` to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub top_k: Option<usize>,
    pub threshold: Option<f64>,
}

/// Image in, decision out. Holds no per-request state, so one instance can
/// be shared by every request thread.
#[derive(Clone)]
pub struct WasteSorter {
    classifier: Arc<dyn ImageClassifier + Send + Sync>,
    policy: DecisionPolicy,
    top_k: usize,
}

impl WasteSorter {
    pub fn new(
        classifier: Arc<dyn ImageClassifier + Send + Sync>,
        policy: DecisionPolicy,
        top_k: usize,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&policy.threshold) {
            return Err(Error::Config(format!(
                "threshold must be within [0, 1], got {}",
                policy.threshold
            )));
        }
        if top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".to_string()));
        }
        if !classifier.vocabulary().contains(&policy.recycle_label) {
            return Err(Error::Config(format!(
                "recycle label {:?} is not one of the model labels {:?}",
                policy.recycle_label,
                classifier.vocabulary().labels()
            )));
        }

        Ok(Self {
            classifier,
            policy,
            top_k,
        })
    }

    /// Loads the ONNX model named by `config`.
    pub fn load(config: &Config) -> Result<Self> {
        let model_config = ModelConfig::from_dir(&config.model_dir);
        let classifier = ImageClassifierTractOnnx::new(&model_config)?;
        Self::new(Arc::new(classifier), config.decision_policy(), config.top_k)
    }

    pub fn classifier(&self) -> &Arc<dyn ImageClassifier + Send + Sync> {
        &self.classifier
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn scores(&self, image: &DynamicImage) -> Result<ScoreVector> {
        let input = normalize_image(image, self.classifier.preprocessing())?;
        self.classifier.classify(input)
    }

    pub fn classify_image(&self, image: &DynamicImage, overrides: Overrides) -> Result<Decision> {
        let scores = self.scores(image)?;

        let k = overrides.top_k.unwrap_or(self.top_k);
        let ranking = interpret(&scores, self.classifier.vocabulary(), k)?;

        let threshold = overrides
            .threshold
            .filter(|t| !t.is_nan())
            .map_or(self.policy.threshold, |t| t.clamp(0.0, 1.0));

        Ok(decide(ranking, &self.policy.recycle_label, threshold))
    }

    pub fn classify_bytes(&self, bytes: &[u8], overrides: Overrides) -> Result<Decision> {
        let image = decode_image(bytes)?;
        self.classify_image(&image, overrides)
    }
}

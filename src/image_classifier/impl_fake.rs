use crate::error::{Error, Result};
use crate::image_classifier::interface::ImageClassifier;
use crate::image_classifier::preprocess::Preprocessing;
use crate::image_classifier::vocabulary::Vocabulary;
use crate::sorter::score::ScoreVector;
use rand::distr::{Distribution, Uniform};
use std::sync::atomic::{AtomicUsize, Ordering};
use tract_onnx::prelude::Tensor;

enum Scores {
    Fixed(Vec<f32>),
    Random,
}

/// Stands in for a real model: returns fixed or random logits, but still
/// checks that the input tensor has the shape the model would expect.
pub struct ImageClassifierFake {
    vocabulary: Vocabulary,
    preprocessing: Preprocessing,
    scores: Scores,
    calls: AtomicUsize,
}

impl ImageClassifierFake {
    pub fn new(vocabulary: Vocabulary, preprocessing: Preprocessing, scores: Vec<f32>) -> Self {
        Self {
            vocabulary,
            preprocessing,
            scores: Scores::Fixed(scores),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn random(vocabulary: Vocabulary, preprocessing: Preprocessing) -> Self {
        Self {
            vocabulary,
            preprocessing,
            scores: Scores::Random,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageClassifier for ImageClassifierFake {
    fn classify(&self, input: Tensor) -> Result<ScoreVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let expected = self.preprocessing.input_shape();
        if input.shape() != expected {
            return Err(Error::ModelUnavailable(format!(
                "input shape {:?} does not match model input {:?}",
                input.shape(),
                expected
            )));
        }

        let logits = match &self.scores {
            Scores::Fixed(scores) => scores.clone(),
            Scores::Random => {
                let mut rng = rand::rng();
                let logit_dist = Uniform::new(-4.0f32, 4.0f32).map_err(Error::model_unavailable)?;
                (0..self.vocabulary.size())
                    .map(|_| logit_dist.sample(&mut rng))
                    .collect()
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

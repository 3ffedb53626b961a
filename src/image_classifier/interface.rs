use crate::error::Result;
use crate::image_classifier::preprocess::Preprocessing;
use crate::image_classifier::vocabulary::Vocabulary;
use crate::sorter::score::ScoreVector;
use tract_onnx::prelude::Tensor;

/// A loaded classification model. Implementations are immutable after
/// construction, so one instance can serve many threads at once.
pub trait ImageClassifier: Send + Sync {
    /// Runs one forward pass over an NCHW tensor shaped like
    /// `preprocessing().input_shape()`, returning one logit per label.
    fn classify(&self, input: Tensor) -> Result<ScoreVector>;

    fn vocabulary(&self) -> &Vocabulary;

    fn preprocessing(&self) -> &Preprocessing;

    fn label_for(&self, index: usize) -> Option<&str> {
        self.vocabulary().label_for(index)
    }

    fn vocabulary_size(&self) -> usize {
        self.vocabulary().size()
    }
}

use crate::error::{Error, Result};
use crate::image_classifier::vocabulary::Vocabulary;
use serde::Serialize;

/// Raw logits for one image, one per label index. Never empty, always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
    values: Vec<f32>,
}

impl ScoreVector {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::Inference("model returned no scores".to_string()));
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::Inference(format!(
                "score {} is not finite: {}",
                index, values[index]
            )));
        }
        Ok(Self { values })
    }

    /// A count that differs from the vocabulary means the model's output
    /// shape is wrong, which is reported as `ModelUnavailable`.
    pub fn for_vocabulary(values: Vec<f32>, vocabulary: &Vocabulary) -> Result<Self> {
        if values.len() != vocabulary.size() {
            return Err(Error::ModelUnavailable(format!(
                "model returned {} scores for {} labels",
                values.len(),
                vocabulary.size()
            )));
        }
        Self::new(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the highest score; the lowest index wins ties.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (index, value) in self.values.iter().enumerate() {
            if *value > self.values[best] {
                best = index;
            }
        }
        best
    }
}

/// Numerically stable softmax: the max is subtracted before exponentiating.
pub fn softmax(scores: &ScoreVector) -> Vec<f64> {
    let max = scores
        .values()
        .iter()
        .map(|v| *v as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores
        .values()
        .iter()
        .map(|v| (*v as f64 - max).exp())
        .collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(skip)]
    pub index: usize,
    pub label: String,
    #[serde(rename = "score")]
    pub probability: f64,
}

/// Candidates ordered by probability, highest first. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ranking {
    candidates: Vec<Candidate>,
}

impl Ranking {
    /// Sorts by probability descending. The sort is stable, so candidates
    /// given in label-index order keep that order on ties.
    pub fn from_candidates(mut candidates: Vec<Candidate>) -> Option<Self> {
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Some(Self { candidates })
    }

    pub fn best(&self) -> &Candidate {
        &self.candidates[0]
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Turns logits into the top `k` labelled probabilities. `k` is clamped to
/// `1..=vocabulary.size()`.
pub fn interpret(scores: &ScoreVector, vocabulary: &Vocabulary, k: usize) -> Result<Ranking> {
    if scores.len() != vocabulary.size() {
        return Err(Error::Inference(format!(
            "{} scores cannot be matched to {} labels",
            scores.len(),
            vocabulary.size()
        )));
    }

    let candidates: Vec<Candidate> = softmax(scores)
        .into_iter()
        .zip(vocabulary.labels())
        .enumerate()
        .map(|(index, (probability, label))| Candidate {
            index,
            label: label.clone(),
            probability,
        })
        .collect();

    let mut ranking = Ranking::from_candidates(candidates)
        .ok_or_else(|| Error::Inference("no candidates to rank".to_string()))?;
    ranking
        .candidates
        .truncate(k.clamp(1, vocabulary.size()));
    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vocabulary {
        Vocabulary::new(["organic", "recyclable"]).unwrap()
    }

    fn scores(values: &[f32]) -> ScoreVector {
        ScoreVector::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let inputs: Vec<Vec<f32>> = vec![
            vec![2.0, 0.1],
            vec![0.0],
            vec![-3.0, 0.0, 3.0, 1.5, -0.25],
            vec![1000.0, 999.0, -1000.0],
            vec![-1e30, -1e30],
            (0..1000).map(|i| (i as f32).sin() * 20.0).collect(),
        ];

        for input in inputs {
            let probabilities = softmax(&scores(&input));
            assert_eq!(probabilities.len(), input.len());
            assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
            let sum: f64 = probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "sum was {}", sum);
        }
    }

    #[test]
    fn test_softmax_large_logits_do_not_overflow() {
        let probabilities = softmax(&scores(&[f32::MAX, f32::MAX]));
        assert!((probabilities[0] - 0.5).abs() < 1e-12);
        assert!((probabilities[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scenario_a_probabilities() {
        let ranking = interpret(&scores(&[2.0, 0.1]), &labels(), 2).unwrap();

        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking.best().label, "organic");
        assert!((ranking.best().probability - 0.8699).abs() < 1e-3);
        assert_eq!(ranking.candidates()[1].label, "recyclable");
        assert!((ranking.candidates()[1].probability - 0.1301).abs() < 1e-3);
    }

    #[test]
    fn test_ranking_is_descending() {
        let vocabulary = Vocabulary::new(["a", "b", "c", "d", "e"]).unwrap();
        let ranking = interpret(&scores(&[0.3, 2.0, -1.0, 2.5, 0.0]), &vocabulary, 5).unwrap();

        let labels: Vec<&str> = ranking.candidates().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["d", "b", "a", "e", "c"]);
        for pair in ranking.candidates().windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
    }

    #[test]
    fn test_ties_keep_label_order() {
        let vocabulary = Vocabulary::new(["a", "b", "c", "d"]).unwrap();
        let ranking = interpret(&scores(&[1.0, 3.0, 1.0, 3.0]), &vocabulary, 4).unwrap();

        let indices: Vec<usize> = ranking.candidates().iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_interpret_is_deterministic() {
        let vocabulary = Vocabulary::new(["a", "b", "c"]).unwrap();
        let input = scores(&[0.5, 0.5, 0.5]);

        let first = interpret(&input, &vocabulary, 2).unwrap();
        let second = interpret(&input, &vocabulary, 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(input, scores(&[0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_k_is_clamped() {
        let input = scores(&[2.0, 0.1]);
        assert_eq!(interpret(&input, &labels(), 0).unwrap().len(), 1);
        assert_eq!(interpret(&input, &labels(), 1).unwrap().len(), 1);
        assert_eq!(interpret(&input, &labels(), 3).unwrap().len(), 2);
    }

    #[test]
    fn test_length_mismatch_is_inference_error() {
        let result = interpret(&scores(&[1.0, 2.0, 3.0]), &labels(), 2);
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    #[test]
    fn test_invalid_score_vectors() {
        assert!(matches!(ScoreVector::new(vec![]), Err(Error::Inference(_))));
        assert!(matches!(
            ScoreVector::new(vec![1.0, f32::NAN]),
            Err(Error::Inference(_))
        ));
        assert!(matches!(
            ScoreVector::new(vec![f32::INFINITY]),
            Err(Error::Inference(_))
        ));
        assert!(matches!(
            ScoreVector::for_vocabulary(vec![1.0], &labels()),
            Err(Error::ModelUnavailable(_))
        ));
        assert!(matches!(
            ScoreVector::for_vocabulary(vec![1.0, f32::NAN], &labels()),
            Err(Error::Inference(_))
        ));
    }

    #[test]
    fn test_argmax_prefers_lowest_index() {
        assert_eq!(scores(&[1.0, 3.0, 3.0]).argmax(), 1);
        assert_eq!(scores(&[-1.0]).argmax(), 0);
    }

    #[test]
    fn test_ranking_serializes_as_label_score_list() {
        let ranking = interpret(&scores(&[0.0, 0.0]), &labels(), 2).unwrap();
        let json = serde_json::to_value(&ranking).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"label": "organic", "score": 0.5},
                {"label": "recyclable", "score": 0.5}
            ])
        );
    }
}

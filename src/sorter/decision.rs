use crate::image_classifier::vocabulary::normalize_label;
use crate::sorter::score::Ranking;
use serde::Serialize;

pub const DEFAULT_THRESHOLD: f64 = 0.60;

pub const LOW_CONFIDENCE_NOTE: &str = "Low confidence → treated as non-recyclable";

/// Final verdict for one image, shaped for the web layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub label: String,
    pub confidence: f64,
    pub is_recyclable: bool,
    pub top_k: Ranking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Decision {
    pub fn is_low_confidence(&self) -> bool {
        self.note.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPolicy {
    pub recycle_label: String,
    /// Inclusive lower bound on the top probability.
    pub threshold: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            recycle_label: "recyclable".to_string(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl DecisionPolicy {
    pub fn decide(&self, ranking: Ranking) -> Decision {
        decide(ranking, &self.recycle_label, self.threshold)
    }
}

/// Below `threshold` the answer is always "not recyclable", whatever label
/// won; the raw top label and its probability are still reported. A
/// non-finite threshold is replaced by `DEFAULT_THRESHOLD`.
pub fn decide(ranking: Ranking, recycle_label: &str, threshold: f64) -> Decision {
    let threshold = if threshold.is_finite() {
        threshold
    } else {
        DEFAULT_THRESHOLD
    };
    let best = ranking.best();
    let label = best.label.clone();
    let confidence = best.probability;

    if confidence < threshold {
        return Decision {
            label,
            confidence,
            is_recyclable: false,
            top_k: ranking,
            note: Some(LOW_CONFIDENCE_NOTE.to_string()),
        };
    }

    let is_recyclable = normalize_label(&label) == normalize_label(recycle_label);
    Decision {
        label,
        confidence,
        is_recyclable,
        top_k: ranking,
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorter::score::Candidate;

    fn ranking(entries: &[(&str, f64)]) -> Ranking {
        Ranking::from_candidates(
            entries
                .iter()
                .enumerate()
                .map(|(index, (label, probability))| Candidate {
                    index,
                    label: label.to_string(),
                    probability: *probability,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let decision = decide(
            ranking(&[("recyclable", 0.60), ("organic", 0.40)]),
            "recyclable",
            0.60,
        );
        assert!(decision.is_recyclable);
        assert_eq!(decision.note, None);
    }

    #[test]
    fn test_just_below_threshold_is_not_recyclable() {
        let decision = decide(
            ranking(&[("recyclable", 0.599999), ("organic", 0.400001)]),
            "recyclable",
            0.60,
        );
        assert!(!decision.is_recyclable);
        assert_eq!(decision.note.as_deref(), Some(LOW_CONFIDENCE_NOTE));
        assert_eq!(decision.label, "recyclable");
        assert_eq!(decision.confidence, 0.599999);
    }

    #[test]
    fn test_label_match_is_case_insensitive() {
        let decision = decide(
            ranking(&[("Recyclable", 0.95), ("organic", 0.05)]),
            "recyclable",
            0.60,
        );
        assert!(decision.is_recyclable);
        assert_eq!(decision.label, "Recyclable");
    }

    #[test]
    fn test_confident_other_label_has_no_note() {
        let decision = decide(
            ranking(&[("organic", 0.8698), ("recyclable", 0.1302)]),
            "recyclable",
            0.60,
        );
        assert!(!decision.is_recyclable);
        assert!(!decision.is_low_confidence());
        assert_eq!(decision.label, "organic");
    }

    #[test]
    fn test_low_confidence_other_label_still_noted() {
        let decision = DecisionPolicy::default().decide(ranking(&[("organic", 0.51), ("recyclable", 0.49)]));
        assert!(!decision.is_recyclable);
        assert!(decision.is_low_confidence());
    }

    #[test]
    fn test_policy_threshold_is_configurable() {
        let policy = DecisionPolicy {
            recycle_label: "recyclable".to_string(),
            threshold: 0.5,
        };
        let decision = policy.decide(ranking(&[("recyclable", 0.55), ("organic", 0.45)]));
        assert!(decision.is_recyclable);
    }

    #[test]
    fn test_non_finite_threshold_uses_default() {
        let weak = ranking(&[("recyclable", 0.55), ("organic", 0.45)]);
        for threshold in [f64::NAN, f64::NEG_INFINITY, f64::INFINITY] {
            let decision = decide(weak.clone(), "recyclable", threshold);
            assert!(!decision.is_recyclable);
            assert!(decision.is_low_confidence());
        }

        let policy = DecisionPolicy {
            recycle_label: "recyclable".to_string(),
            threshold: f64::NAN,
        };
        let decision = policy.decide(ranking(&[("recyclable", 0.65), ("organic", 0.35)]));
        assert!(decision.is_recyclable);
        assert!(!decision.is_low_confidence());
    }

    #[test]
    fn test_decision_serializes_to_record() {
        let decision = decide(
            ranking(&[("organic", 0.75), ("recyclable", 0.25)]),
            "recyclable",
            0.60,
        );
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "label": "organic",
                "confidence": 0.75,
                "is_recyclable": false,
                "top_k": [
                    {"label": "organic", "score": 0.75},
                    {"label": "recyclable", "score": 0.25}
                ]
            })
        );

        let low = decide(ranking(&[("recyclable", 0.5), ("organic", 0.5)]), "recyclable", 0.6);
        let json = serde_json::to_value(&low).unwrap();
        assert_eq!(json["note"], LOW_CONFIDENCE_NOTE);
    }
}

use serde::{Deserialize, Serialize};

use crate::base::{SentimentLabel, SentimentScore};

/// Per-label counts and mean confidences over one request's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_avg_confidence: f64,
    pub negative_avg_confidence: f64,
    pub total_reviews: usize,
}

impl Summary {
    pub fn from_scores(scores: &[SentimentScore]) -> Self {
        let (positive_count, positive_total) = label_totals(scores, SentimentLabel::Positive);
        let (negative_count, negative_total) = label_totals(scores, SentimentLabel::Negative);
        Summary {
            positive_count,
            negative_count,
            positive_avg_confidence: mean(positive_total, positive_count),
            negative_avg_confidence: mean(negative_total, negative_count),
            total_reviews: scores.len(),
        }
    }
}

fn label_totals(scores: &[SentimentScore], label: SentimentLabel) -> (usize, f64) {
    scores
        .iter()
        .filter(|score| score.label == label)
        .fold((0, 0.0), |(count, total), score| {
            (count + 1, total + score.score as f64)
        })
}

// A label that never occurs averages to 0, not NaN.
fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(label: SentimentLabel, score: f32) -> SentimentScore {
        SentimentScore { label, score }
    }

    #[test]
    fn mixed_results() {
        let summary = Summary::from_scores(&[
            score(SentimentLabel::Positive, 0.75),
            score(SentimentLabel::Negative, 0.5),
            score(SentimentLabel::Positive, 0.25),
        ]);
        assert_eq!(summary.positive_count, 2);
        assert_eq!(summary.negative_count, 1);
        assert_eq!(summary.positive_avg_confidence, 0.5);
        assert_eq!(summary.negative_avg_confidence, 0.5);
        assert_eq!(summary.total_reviews, 3);
    }

    #[test]
    fn all_positive_reports_zero_negative_mean() {
        let summary = Summary::from_scores(&[
            score(SentimentLabel::Positive, 0.75),
            score(SentimentLabel::Positive, 0.875),
        ]);
        assert_eq!(summary.negative_count, 0);
        assert_eq!(summary.negative_avg_confidence, 0.0);
        assert!(!summary.negative_avg_confidence.is_nan());
        assert_eq!(summary.positive_avg_confidence, 0.8125);
    }

    #[test]
    fn no_results() {
        let summary = Summary::from_scores(&[]);
        assert_eq!(
            summary,
            Summary {
                positive_count: 0,
                negative_count: 0,
                positive_avg_confidence: 0.0,
                negative_avg_confidence: 0.0,
                total_reviews: 0,
            }
        );
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_value(Summary::from_scores(&[])).unwrap();
        for key in [
            "positive_count",
            "negative_count",
            "positive_avg_confidence",
            "negative_avg_confidence",
            "total_reviews",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}

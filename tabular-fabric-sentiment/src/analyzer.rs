use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::base::{ReviewTable, SentimentScore, SequenceClassifier};
use crate::constants::{CONFIDENCE_COLUMN_NAME, REVIEW_COLUMN_NAME, SENTIMENT_COLUMN_NAME};
use crate::errors::{AnalyzeError, InferError};
use crate::infer::batch::analyze_batch;
use crate::summary::Summary;
use crate::validate::validate_table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub summary: Summary,
    pub reviews: Vec<Map<String, Value>>,
}

/// Process-wide sentiment service. Built once at start-up and shared by
/// reference with every request; nothing in it changes afterwards.
#[derive(Clone)]
pub struct SentimentAnalyzer {
    classifier: Arc<dyn SequenceClassifier>,
    batch_size: usize,
}

impl SentimentAnalyzer {
    pub fn new(
        classifier: Arc<dyn SequenceClassifier>,
        batch_size: usize,
    ) -> Result<Self, InferError> {
        if batch_size == 0 {
            return Err(InferError::GenericError {
                msg: "batch size must be positive".to_string(),
            });
        }
        Ok(SentimentAnalyzer {
            classifier,
            batch_size,
        })
    }

    pub fn model_name(&self) -> &str {
        self.classifier.model_name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn analyze_text(&self, text: &str) -> Result<SentimentScore, InferError> {
        let mut scores = self.analyze_batch(&[text.to_string()]).await?;
        scores.pop().ok_or_else(|| InferError::GenericError {
            msg: "no score returned".to_string(),
        })
    }

    pub async fn analyze_batch(&self, texts: &[String]) -> Result<Vec<SentimentScore>, InferError> {
        analyze_batch(self.classifier.as_ref(), texts, self.batch_size).await
    }

    /// Parses, validates, and scores an uploaded CSV, returning every original row
    /// extended with its sentiment plus the aggregate summary.
    pub async fn analyze_csv(&self, content: &[u8]) -> Result<AnalyzeResponse, AnalyzeError> {
        let content = std::str::from_utf8(content).map_err(|e| AnalyzeError::ProcessingError {
            msg: e.to_string(),
        })?;
        let table = ReviewTable::from_csv(content, &[REVIEW_COLUMN_NAME])?;
        if let Some(validation_error) = validate_table(&table) {
            return Err(validation_error.into());
        }

        let texts = table.text_values(REVIEW_COLUMN_NAME)?;
        let scores = self.analyze_batch(&texts).await?;
        let summary = Summary::from_scores(&scores);

        let mut reviews = table.to_rows()?;
        if reviews.len() != scores.len() {
            return Err(AnalyzeError::ProcessingError {
                msg: format!(
                    "{} rows but {} sentiment results",
                    reviews.len(),
                    scores.len()
                ),
            });
        }
        for ((row, text), score) in reviews.iter_mut().zip(texts).zip(&scores) {
            row.insert(REVIEW_COLUMN_NAME.to_string(), Value::String(text));
            row.insert(
                SENTIMENT_COLUMN_NAME.to_string(),
                Value::String(score.label.to_string()),
            );
            row.insert(
                CONFIDENCE_COLUMN_NAME.to_string(),
                serde_json::json!(score.score),
            );
        }

        info!(
            total_reviews = summary.total_reviews,
            positive = summary.positive_count,
            negative = summary.negative_count,
            "analyzed csv upload"
        );
        Ok(AnalyzeResponse { summary, reviews })
    }
}

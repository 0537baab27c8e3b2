use tracing::debug;

use crate::base::{SentimentScore, SequenceClassifier};
use crate::errors::InferError;

/// Scores `texts` in consecutive chunks of `batch_size`, one classifier call per
/// chunk, and returns one score per text in input order.
///
/// Control is handed back to the scheduler after every chunk so other requests
/// on the same worker can make progress between chunks. The first failing chunk
/// fails the whole call; nothing scored so far is returned.
pub async fn analyze_batch(
    classifier: &dyn SequenceClassifier,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<SentimentScore>, InferError> {
    if batch_size == 0 {
        return Err(InferError::GenericError {
            msg: "batch size must be positive".to_string(),
        });
    }
    let mut scores = Vec::with_capacity(texts.len());
    for (chunk_pos, chunk_texts) in texts.chunks(batch_size).enumerate() {
        let posteriors = classifier.classify(chunk_texts)?;
        if posteriors.len() != chunk_texts.len() {
            return Err(InferError::PosteriorCountMismatch {
                expected: chunk_texts.len(),
                actual: posteriors.len(),
            });
        }
        for posterior in &posteriors {
            scores.push(SentimentScore::from_posterior(posterior)?);
        }
        debug!(
            chunk = chunk_pos,
            chunk_len = chunk_texts.len(),
            scored = scores.len(),
            "scored chunk"
        );
        tokio::task::yield_now().await;
    }
    Ok(scores)
}

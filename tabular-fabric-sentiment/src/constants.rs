pub const REVIEW_COLUMN_NAME: &str = "review";
pub const SENTIMENT_COLUMN_NAME: &str = "sentiment";
pub const CONFIDENCE_COLUMN_NAME: &str = "confidence";

pub const DEFAULT_MODEL_NAME: &str = "distilbert-base-uncased-finetuned-sst-2-english";
pub const DEFAULT_MODEL_REVISION: &str = "main";
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Token-length bound; longer inputs are truncated, never rejected.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

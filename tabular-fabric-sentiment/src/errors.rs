use arrow::error::ArrowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferError {
    #[error("generic error: {msg}")]
    GenericError { msg: String },

    #[error("candle error: {source}")]
    CandleError { source: candle_core::Error },

    #[error("arrow error: {source}")]
    ArrowError { source: ArrowError },

    #[error("classifier returned {actual} posteriors for a chunk of {expected} texts")]
    PosteriorCountMismatch { expected: usize, actual: usize },

    #[error("unspecified inference error: {msg}")]
    UnspecifiedError { msg: String, source: anyhow::Error },
}

impl From<anyhow::Error> for InferError {
    fn from(err: anyhow::Error) -> Self {
        InferError::UnspecifiedError {
            msg: err.to_string(),
            source: err,
        }
    }
}

impl From<candle_core::Error> for InferError {
    fn from(err: candle_core::Error) -> Self {
        InferError::CandleError { source: err }
    }
}

impl From<ArrowError> for InferError {
    fn from(err: ArrowError) -> Self {
        InferError::ArrowError { source: err }
    }
}

/// Structural problems with an uploaded table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("CSV file must contain a '{column}' column")]
    MissingColumn { column: String },

    #[error("CSV file is empty")]
    EmptyDataset,
}

/// Everything that can fail an `/analyze` request.
///
/// The first three kinds are the caller's to fix; `ProcessingError` carries the
/// raw text of whatever went wrong underneath.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Only CSV files are accepted")]
    InvalidFileType { filename: String },

    #[error("No file uploaded")]
    MissingUpload,

    #[error("{source}")]
    ValidationError { source: ValidationError },

    #[error("Error processing CSV: {msg}")]
    ProcessingError { msg: String },
}

impl AnalyzeError {
    pub fn is_user_error(&self) -> bool {
        !matches!(self, AnalyzeError::ProcessingError { .. })
    }
}

impl From<ValidationError> for AnalyzeError {
    fn from(err: ValidationError) -> Self {
        AnalyzeError::ValidationError { source: err }
    }
}

impl From<InferError> for AnalyzeError {
    fn from(err: InferError) -> Self {
        AnalyzeError::ProcessingError {
            msg: err.to_string(),
        }
    }
}

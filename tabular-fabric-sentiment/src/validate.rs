use crate::base::ReviewTable;
use crate::constants::REVIEW_COLUMN_NAME;
use crate::errors::ValidationError;

/// Checks the shape of an upload before any text reaches the classifier.
pub fn validate_table(table: &ReviewTable) -> Option<ValidationError> {
    if !table.has_column(REVIEW_COLUMN_NAME) {
        return Some(ValidationError::MissingColumn {
            column: REVIEW_COLUMN_NAME.to_string(),
        });
    }
    if table.num_rows() == 0 {
        return Some(ValidationError::EmptyDataset);
    }
    None
}

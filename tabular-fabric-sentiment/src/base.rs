use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use arrow::array::AsArray;
use arrow::compute::{cast, concat_batches};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::json::writer::JsonArray;
use arrow::json::WriterBuilder;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::InferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Negative,
    Positive,
}

impl SentimentLabel {
    /// Class index order of the SST-2 head: 0 is negative, everything else positive.
    pub fn from_class_index(index: usize) -> Self {
        if index == 0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Positive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "NEGATIVE",
            SentimentLabel::Positive => "POSITIVE",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub score: f32,
}

impl SentimentScore {
    /// Picks the most probable class of a softmax posterior.
    ///
    /// Ties go to the lower class index, so `[0.5, 0.5]` is negative.
    pub fn from_posterior(posterior: &[f32]) -> Result<Self, InferError> {
        let mut best: Option<(usize, f32)> = None;
        for (index, probability) in posterior.iter().copied().enumerate() {
            match best {
                Some((_, current)) if current >= probability => {}
                _ => best = Some((index, probability)),
            }
        }
        match best {
            Some((index, score)) => Ok(SentimentScore {
                label: SentimentLabel::from_class_index(index),
                score,
            }),
            None => Err(InferError::GenericError {
                msg: "empty posterior".to_string(),
            }),
        }
    }
}

/// The opaque scoring function behind the batch engine.
///
/// One call scores one chunk and returns one probability distribution per text,
/// in the order the texts were given. Implementations are shared read-only
/// across requests.
pub trait SequenceClassifier: Send + Sync {
    fn model_name(&self) -> &str;

    fn classify(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, InferError>;
}

/// A parsed upload: named columns, one arrow batch.
#[derive(Debug, Clone)]
pub struct ReviewTable {
    batch: RecordBatch,
}

impl ReviewTable {
    pub fn new(batch: RecordBatch) -> Self {
        ReviewTable { batch }
    }

    /// Reads CSV text with a header row, inferring column types from the data.
    ///
    /// Columns named in `text_columns` are always read as text, so values such
    /// as `007` keep their spelling. Rows with fewer fields than the header get
    /// nulls for the missing trailing cells.
    pub fn from_csv(content: &str, text_columns: &[&str]) -> Result<Self, InferError> {
        if content.trim().is_empty() {
            return Ok(ReviewTable::new(RecordBatch::new_empty(Arc::new(
                Schema::empty(),
            ))));
        }
        let (inferred, _) = Format::default()
            .with_header(true)
            .with_truncated_rows(true)
            .infer_schema(Cursor::new(content.as_bytes()), None)?;
        let fields = inferred
            .fields()
            .iter()
            .map(|field| {
                if text_columns.contains(&field.name().as_str()) {
                    Field::new(field.name(), DataType::Utf8, true)
                } else {
                    field.as_ref().clone()
                }
            })
            .collect_vec();
        let schema: SchemaRef = Arc::new(Schema::new(fields));
        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_truncated_rows(true)
            .build(Cursor::new(content.as_bytes()))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        let batch = concat_batches(&schema, &batches)?;
        Ok(ReviewTable { batch })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().to_string())
            .collect_vec()
    }

    pub fn has_column(&self, column_name: &str) -> bool {
        self.batch.schema().column_with_name(column_name).is_some()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Column values as text, with nulls coerced to empty strings.
    pub fn text_values(&self, column_name: &str) -> Result<Vec<String>, InferError> {
        let array = self
            .batch
            .column_by_name(column_name)
            .ok_or_else(|| InferError::GenericError {
                msg: format!("column not found: {}", column_name),
            })?;
        let array = cast(array, &DataType::Utf8)?;
        let values = array
            .as_string::<i32>()
            .iter()
            .map(|value| value.unwrap_or_default().to_string())
            .collect_vec();
        Ok(values)
    }

    /// One JSON object per row, columns in table order, nulls kept as `null`.
    pub fn to_rows(&self) -> Result<Vec<Map<String, Value>>, InferError> {
        let mut writer = WriterBuilder::new()
            .with_explicit_nulls(true)
            .build::<_, JsonArray>(Vec::new());
        writer.write(&self.batch)?;
        writer.finish()?;
        let buf = writer.into_inner();
        if buf.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<Map<String, Value>> =
            serde_json::from_slice(&buf).map_err(anyhow::Error::from)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posterior_argmax_picks_label_and_mass() {
        let negative = SentimentScore::from_posterior(&[0.9, 0.1]).unwrap();
        assert_eq!(negative.label, SentimentLabel::Negative);
        assert_eq!(negative.score, 0.9);

        let positive = SentimentScore::from_posterior(&[0.2, 0.8]).unwrap();
        assert_eq!(positive.label, SentimentLabel::Positive);
        assert_eq!(positive.score, 0.8);
    }

    #[test]
    fn posterior_tie_resolves_to_negative() {
        let tie = SentimentScore::from_posterior(&[0.5, 0.5]).unwrap();
        assert_eq!(tie.label, SentimentLabel::Negative);
        assert_eq!(tie.score, 0.5);
    }

    #[test]
    fn empty_posterior_is_an_error() {
        assert!(SentimentScore::from_posterior(&[]).is_err());
    }

    #[test]
    fn labels_serialize_uppercase() {
        let json = serde_json::to_string(&SentimentLabel::Positive).unwrap();
        assert_eq!(json, "\"POSITIVE\"");
        assert_eq!(SentimentLabel::Negative.to_string(), "NEGATIVE");
    }

    #[test]
    fn csv_columns_and_rows() {
        let content = "id,review\n1,great product\n2,\"terrible, broke immediately\"\n";
        let table = ReviewTable::from_csv(content, &["review"]).unwrap();
        assert_eq!(table.column_names(), vec!["id", "review"]);
        assert!(table.has_column("review"));
        assert!(!table.has_column("text"));
        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.text_values("review").unwrap(),
            vec!["great product", "terrible, broke immediately"]
        );
    }

    #[test]
    fn null_text_is_coerced_to_empty() {
        let table = ReviewTable::from_csv("id,review\n1,fine\n2,\n", &["review"]).unwrap();
        assert_eq!(table.text_values("review").unwrap(), vec!["fine", ""]);
    }

    #[test]
    fn non_text_column_is_cast_to_text() {
        let table = ReviewTable::from_csv("stars\n10\n20\n", &[]).unwrap();
        assert_eq!(table.text_values("stars").unwrap(), vec!["10", "20"]);
    }

    #[test]
    fn text_columns_keep_their_spelling() {
        let content = "review,stars\n007,5\n4.50,4\n";
        let table = ReviewTable::from_csv(content, &["review"]).unwrap();
        assert_eq!(table.text_values("review").unwrap(), vec!["007", "4.50"]);
        let rows = table.to_rows().unwrap();
        assert_eq!(rows[0]["review"], serde_json::json!("007"));
        assert_eq!(rows[1]["stars"], serde_json::json!(4));
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let content = "id,review,stars\n1,good\n2,bad,1\n";
        let table = ReviewTable::from_csv(content, &["review"]).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.text_values("review").unwrap(), vec!["good", "bad"]);
        let rows = table.to_rows().unwrap();
        assert_eq!(rows[0]["stars"], Value::Null);
        assert_eq!(rows[1]["stars"], serde_json::json!(1));
    }

    #[test]
    fn rows_keep_column_order_and_types() {
        let content = "review,stars\nlovely,5\nawful,\n";
        let table = ReviewTable::from_csv(content, &["review"]).unwrap();
        let rows = table.to_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys().collect_vec(), vec!["review", "stars"]);
        assert_eq!(rows[0]["stars"], serde_json::json!(5));
        assert_eq!(rows[1]["stars"], Value::Null);
    }

    #[test]
    fn header_only_csv_has_zero_rows() {
        let table = ReviewTable::from_csv("review\n", &["review"]).unwrap();
        assert!(table.has_column("review"));
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn blank_content_has_no_columns() {
        let table = ReviewTable::from_csv("  \n", &["review"]).unwrap();
        assert!(table.column_names().is_empty());
        assert_eq!(table.num_rows(), 0);
    }
}

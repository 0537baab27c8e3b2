use envconfig::Envconfig;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MODEL_NAME, DEFAULT_MODEL_REVISION, MAX_SEQUENCE_LENGTH,
};
use crate::models::distilbert::CandleDistilBertArg;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "TABULAR_SENTIMENT_SERVER_HOST", default = "0.0.0.0")]
    pub serve_host: String,

    #[envconfig(from = "TABULAR_SENTIMENT_SERVER_PORT", default = "8000")]
    pub serve_port: u16,

    #[envconfig(from = "TABULAR_SENTIMENT_SERVER_WORKERS")]
    pub serve_workers: Option<usize>,

    #[envconfig(from = "TABULAR_SENTIMENT_MODEL_NAME")]
    pub model_name: Option<String>,

    #[envconfig(from = "TABULAR_SENTIMENT_MODEL_REVISION")]
    pub model_revision: Option<String>,

    #[envconfig(from = "TABULAR_SENTIMENT_MODEL_DIR")]
    pub model_dir: Option<String>,

    #[envconfig(from = "TABULAR_SENTIMENT_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    #[envconfig(from = "TABULAR_SENTIMENT_MAX_LENGTH")]
    pub max_length: Option<usize>,

    #[envconfig(from = "TABULAR_SENTIMENT_DEVICE", default = "auto")]
    pub device: String,

    #[envconfig(from = "TABULAR_TIMEZONE", default = "UTC")]
    pub timezone: String,

    #[envconfig(from = "TABULAR_LOG_FORMAT", default = "text")]
    pub log_format: String,

    #[envconfig(from = "TABULAR_LOG_LEVEL", default = "INFO")]
    pub log_level: String,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.serve_host, self.serve_port)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn model_arg(&self) -> CandleDistilBertArg {
        CandleDistilBertArg {
            model_id: self
                .model_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            revision: self
                .model_revision
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_REVISION.to_string()),
            model_dir: self.model_dir.clone(),
            device: self.device.clone(),
            max_length: self.max_length.unwrap_or(MAX_SEQUENCE_LENGTH),
        }
    }
}

use std::path::PathBuf;

use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config, DistilBertModel};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use itertools::Itertools;
use serde_json::Value;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::base::SequenceClassifier;
use crate::constants::{DEFAULT_MODEL_NAME, DEFAULT_MODEL_REVISION, MAX_SEQUENCE_LENGTH};
use crate::errors::InferError;
use crate::models::device;

const PAD_TOKEN: &str = "[PAD]";

#[derive(Debug, Clone)]
pub struct CandleDistilBertArg {
    /// Hub model id, also reported as the model name.
    pub model_id: String,

    pub revision: String,

    /// Directory holding `config.json`, `tokenizer.json` and `model.safetensors`.
    /// When set, the hub is never contacted.
    pub model_dir: Option<String>,

    /// `cpu`, `cuda` or `auto`.
    pub device: String,

    /// Token-length bound, longer inputs are truncated.
    pub max_length: usize,
}

impl Default for CandleDistilBertArg {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_NAME.to_string(),
            revision: DEFAULT_MODEL_REVISION.to_string(),
            model_dir: None,
            device: "auto".to_string(),
            max_length: MAX_SEQUENCE_LENGTH,
        }
    }
}

struct ModelFiles {
    config_file: PathBuf,
    tokenizer_file: PathBuf,
    weight_file: PathBuf,
}

impl ModelFiles {
    fn resolve(arg: &CandleDistilBertArg) -> Result<Self, InferError> {
        if let Some(model_dir) = &arg.model_dir {
            let model_dir = PathBuf::from(model_dir);
            return Ok(ModelFiles {
                config_file: model_dir.join("config.json"),
                tokenizer_file: model_dir.join("tokenizer.json"),
                weight_file: model_dir.join("model.safetensors"),
            });
        }
        info!("fetch model {} at revision {}", arg.model_id, arg.revision);
        let api = Api::new().map_err(anyhow::Error::from)?;
        let repo = api.repo(Repo::with_revision(
            arg.model_id.clone(),
            RepoType::Model,
            arg.revision.clone(),
        ));
        Ok(ModelFiles {
            config_file: repo.get("config.json").map_err(anyhow::Error::from)?,
            tokenizer_file: repo.get("tokenizer.json").map_err(anyhow::Error::from)?,
            weight_file: repo.get("model.safetensors").map_err(anyhow::Error::from)?,
        })
    }
}

/// Pads each batch to its longest member and silently cuts inputs longer
/// than `max_length` tokens.
fn configure_tokenizer(tokenizer: &mut Tokenizer, max_length: usize) -> Result<(), InferError> {
    let pad_id = tokenizer.token_to_id(PAD_TOKEN).unwrap_or(0);
    tokenizer
        .with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }))
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(anyhow::Error::msg)?;
    Ok(())
}

/// DistilBERT encoder with the sequence-classification head
/// (`pre_classifier` + ReLU + `classifier`) on the first token.
pub struct CandleDistilBertClassifier {
    model_id: String,
    model: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CandleDistilBertClassifier {
    pub fn load(arg: CandleDistilBertArg) -> Result<Self, InferError> {
        info!(
            "avx: {}, neon: {}, simd128: {}, f16c: {}",
            candle_core::utils::with_avx(),
            candle_core::utils::with_neon(),
            candle_core::utils::with_simd128(),
            candle_core::utils::with_f16c()
        );
        let files = ModelFiles::resolve(&arg)?;

        info!("load tokenizer file {:?}", files.tokenizer_file);
        let mut tokenizer =
            Tokenizer::from_file(&files.tokenizer_file).map_err(anyhow::Error::msg)?;
        configure_tokenizer(&mut tokenizer, arg.max_length)?;

        info!("load config file {:?}", files.config_file);
        let config_str =
            std::fs::read_to_string(&files.config_file).map_err(anyhow::Error::from)?;
        // the hidden size and label count are not readable from candle's config
        let config_json: Value = serde_json::from_str(&config_str).map_err(anyhow::Error::from)?;
        let dim = config_json
            .get("dim")
            .and_then(Value::as_u64)
            .unwrap_or(768) as usize;
        let num_labels = config_json
            .get("id2label")
            .and_then(Value::as_object)
            .map_or(2, |labels| labels.len());
        let config: Config = serde_json::from_str(&config_str).map_err(anyhow::Error::from)?;

        let device = device(&arg.device)?;
        info!("load weight file {:?} on {:?}", files.weight_file, device);
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weight_file], DType::F32, &device)?
        };
        let model = DistilBertModel::load(vb.pp("distilbert"), &config)?;
        let pre_classifier = candle_nn::linear(dim, dim, vb.pp("pre_classifier"))?;
        let classifier = candle_nn::linear(dim, num_labels, vb.pp("classifier"))?;

        info!(
            "loaded {} with {} labels, max length {}",
            arg.model_id, num_labels, arg.max_length
        );
        Ok(Self {
            model_id: arg.model_id,
            model,
            pre_classifier,
            classifier,
            tokenizer,
            device,
        })
    }
}

impl SequenceClassifier for CandleDistilBertClassifier {
    fn model_name(&self) -> &str {
        &self.model_id
    }

    fn classify(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, InferError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(anyhow::Error::msg)?;

        let mut row_ids = Vec::with_capacity(encodings.len());
        let mut row_masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            row_ids.push(Tensor::new(encoding.get_ids(), &self.device)?);
            // candle masks out positions set to 1, the inverse of the tokenizer's mask
            let mask = encoding
                .get_attention_mask()
                .iter()
                .map(|&attend| u8::from(attend == 0))
                .collect_vec();
            row_masks.push(Tensor::new(mask.as_slice(), &self.device)?);
        }
        let input_ids = Tensor::stack(&row_ids, 0)?;
        let (batch_len, seq_len) = input_ids.dims2()?;
        let attention_mask =
            Tensor::stack(&row_masks, 0)?.reshape((batch_len, 1, 1, seq_len))?;
        debug!("input ids {:?}", input_ids.shape());

        let hidden_states = self.model.forward(&input_ids, &attention_mask)?;
        let first_token = hidden_states.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&first_token)?.relu()?;
        let logits = self.classifier.forward(&pooled)?;
        let posteriors = candle_nn::ops::softmax(&logits, D::Minus1)?.to_dtype(DType::F32)?;
        Ok(posteriors.to_vec2::<f32>()?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const WORD_LEVEL_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "[PAD]": 1, "good": 2, "bad": 3, "movie": 4},
            "unk_token": "[UNK]"
        }
    }"#;

    fn word_level_tokenizer(max_length: usize) -> Tokenizer {
        let mut tokenizer = Tokenizer::from_str(WORD_LEVEL_TOKENIZER).unwrap();
        configure_tokenizer(&mut tokenizer, max_length).unwrap();
        tokenizer
    }

    #[test]
    fn long_input_is_truncated_not_rejected() {
        let tokenizer = word_level_tokenizer(MAX_SEQUENCE_LENGTH);
        let text = vec!["good"; 600].join(" ");
        let encoding = tokenizer.encode(text, true).unwrap();
        assert_eq!(encoding.get_ids().len(), 512);
        assert!(encoding.get_ids().iter().all(|&id| id == 2));
    }

    #[test]
    fn batch_pads_to_longest_with_masked_padding() {
        let tokenizer = word_level_tokenizer(MAX_SEQUENCE_LENGTH);
        let encodings = tokenizer
            .encode_batch(vec!["good movie", "bad"], true)
            .unwrap();
        assert_eq!(encodings[0].get_ids(), &[2, 4]);
        assert_eq!(encodings[1].get_ids(), &[3, 1]);
        assert_eq!(encodings[0].get_attention_mask(), &[1, 1]);
        assert_eq!(encodings[1].get_attention_mask(), &[1, 0]);
    }

    #[test]
    fn default_arg_targets_sst2_on_auto_device() {
        let arg = CandleDistilBertArg::default();
        assert_eq!(arg.model_id, "distilbert-base-uncased-finetuned-sst-2-english");
        assert_eq!(arg.revision, "main");
        assert_eq!(arg.device, "auto");
        assert_eq!(arg.max_length, 512);
        assert!(arg.model_dir.is_none());
    }

    #[test]
    fn local_model_dir_skips_the_hub() {
        let arg = CandleDistilBertArg {
            model_dir: Some("/models/sst2".to_string()),
            ..Default::default()
        };
        let files = ModelFiles::resolve(&arg).unwrap();
        assert_eq!(files.config_file, PathBuf::from("/models/sst2/config.json"));
        assert_eq!(files.tokenizer_file, PathBuf::from("/models/sst2/tokenizer.json"));
        assert_eq!(files.weight_file, PathBuf::from("/models/sst2/model.safetensors"));
    }

    #[test]
    fn missing_local_files_fail_to_load() {
        let arg = CandleDistilBertArg {
            model_dir: Some("/nonexistent/sst2".to_string()),
            device: "cpu".to_string(),
            ..Default::default()
        };
        assert!(CandleDistilBertClassifier::load(arg).is_err());
    }
}

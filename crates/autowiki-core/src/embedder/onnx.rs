//! ONNX Runtime-backed `EmbeddingProvider`, gated behind the `onnx` feature.
//!
//! Loads a pre-downloaded model/tokenizer pair from disk; unlike the
//! engine this pattern is adapted from, there is no auto-download step
//! here — operators point `model_path`/`tokenizer_path` at files they
//! already have, matching the `onnx` feature's opt-in-for-real-quality
//! framing.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;

use crate::embedder::{l2_normalize, EmbeddingProvider};
use crate::error::{AutoWikiError, AutoWikiResult};

/// Embeds text using a local ONNX sequence model and its paired tokenizer.
pub struct OnnxEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    dimensions: usize,
    max_seq_length: usize,
}

impl OnnxEmbeddingProvider {
    /// Load a model and tokenizer from disk.
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        dimensions: usize,
        max_seq_length: usize,
    ) -> AutoWikiResult<Self> {
        let session = Session::builder()
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                AutoWikiError::ExternalError(format!(
                    "failed to load ONNX model {}: {e}",
                    model_path.display()
                ))
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path).map_err(|e| {
            AutoWikiError::ExternalError(format!(
                "failed to load tokenizer {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
            max_seq_length,
        })
    }

    fn run(&self, text: &str) -> AutoWikiResult<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| AutoWikiError::ExternalError(format!("tokenization error: {e}")))?;

        let max_len = self.max_seq_length;
        let ids = encoding.get_ids();
        let mask = encoding.get_attention_mask();
        let actual_len = ids.len().min(max_len);

        let mut input_ids = Vec::with_capacity(max_len);
        let mut attention_mask = Vec::with_capacity(max_len);
        for i in 0..actual_len {
            input_ids.push(ids[i] as i64);
            attention_mask.push(mask[i] as i64);
        }
        input_ids.resize(max_len, 0);
        attention_mask.resize(max_len, 0);

        let shape = vec![1i64, max_len as i64];
        let ids_value = ort::value::Tensor::from_array((shape.clone(), input_ids))
            .map_err(|e| AutoWikiError::ExternalError(format!("ONNX tensor error: {e}")))?;
        let mask_value = ort::value::Tensor::from_array((shape, attention_mask.clone()))
            .map_err(|e| AutoWikiError::ExternalError(format!("ONNX tensor error: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AutoWikiError::ExternalError("ONNX session lock poisoned".into()))?;

        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| AutoWikiError::ExternalError("model has no outputs".into()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids_value,
                "attention_mask" => mask_value,
            ])
            .map_err(|e| AutoWikiError::ExternalError(format!("ONNX inference error: {e}")))?;

        let output_value = outputs
            .get(&output_name)
            .ok_or_else(|| AutoWikiError::ExternalError("no output tensor found".into()))?;
        let (shape, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| AutoWikiError::ExternalError(format!("output extraction error: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let mut pooled = if dims.len() == 3 {
            // [1, seq_len, hidden_dim] -> mean pool with attention mask.
            let seq_len = dims[1];
            let hidden_dim = dims[2];
            let mut out = vec![0.0f32; hidden_dim];
            let mut mask_sum = 0.0f32;
            for s in 0..seq_len {
                let m = attention_mask[s] as f32;
                mask_sum += m;
                let offset = s * hidden_dim;
                for d in 0..hidden_dim {
                    out[d] += data[offset + d] * m;
                }
            }
            if mask_sum > 0.0 {
                for v in &mut out {
                    *v /= mask_sum;
                }
            }
            out
        } else {
            data.to_vec()
        };

        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

impl EmbeddingProvider for OnnxEmbeddingProvider {
    fn embed(&self, text: &str) -> Vec<f32> {
        match self.run(text) {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(error = %e, "ONNX embedding failed, returning zero vector");
                vec![0.0; self.dimensions]
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

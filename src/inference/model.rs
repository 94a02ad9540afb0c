//! Shared model state.
//!
//! The model snapshot is published once behind an `Arc` before any job
//! starts and never mutated afterward, so concurrent translation jobs
//! read it without locks. Parameter loading itself lives outside this
//! core; the snapshot here carries the shape knobs the pipeline needs
//! plus a device-resident embedding table standing in for the real
//! weights.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use half::f16;
use tracing::info;

use crate::config::Config;
use crate::gpu::device::DeviceContext;
use crate::gpu::stream::StreamToken;
use crate::gpu::tensor::Tensor;

/// Immutable model snapshot shared by all translation jobs.
pub struct ModelState {
    /// Vocabulary size in tokens.
    pub vocab_size: usize,

    /// Hidden state width.
    pub hidden_dim: usize,

    /// Beam width used by the decoder.
    pub beam_size: usize,

    /// Device-resident embedding table, vocab × hidden, FP16.
    embeddings: Tensor<f16>,
}

impl ModelState {
    /// Load the model snapshot onto the device.
    ///
    /// Stub: a real implementation would read the parameter file and
    /// upload every layer. Here only the embedding table is allocated
    /// (zero-filled) so jobs exercise the same device footprint.
    pub fn load(ctx: Arc<DeviceContext>, config: &Config) -> Self {
        let stream = StreamToken::new();
        let embeddings = Tensor::with_dims(
            ctx,
            stream,
            config.model.vocab_size,
            config.model.hidden_dim,
            1,
            1,
            true,
        );

        info!(
            vocab_size = config.model.vocab_size,
            hidden_dim = config.model.hidden_dim,
            beam_size = config.model.beam_size,
            embedding_bytes = config.embedding_bytes(),
            "Model state published"
        );

        Self {
            vocab_size: config.model.vocab_size,
            hidden_dim: config.model.hidden_dim,
            beam_size: config.model.beam_size,
            embeddings,
        }
    }

    /// The embedding table.
    pub fn embeddings(&self) -> &Tensor<f16> {
        &self.embeddings
    }

    /// Map an input line to token ids.
    ///
    /// Stub for the external tokenizer collaborator: hashes whitespace
    /// words into the vocabulary range.
    pub fn tokenize(&self, line: &str) -> Vec<u32> {
        line.split_whitespace()
            .map(|word| {
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                (hasher.finish() % self.vocab_size as u64) as u32
            })
            .collect()
    }
}

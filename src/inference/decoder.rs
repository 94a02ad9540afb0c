//! Translation jobs.
//!
//! A [`TranslationJob`] consumes one mini batch and produces one
//! translation per sentence, keyed by the sentence's original index so
//! the output stage can restore input order. The beam-search decoder
//! proper is an external collaborator; [`Decoder`] here is the seam
//! implementation that drives the device tensor lifecycle the way the
//! real decoder does and emits placeholder text.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::batch::assembler::MiniBatch;
use crate::gpu::device::DeviceContext;
use crate::gpu::stream::StreamToken;
use crate::gpu::tensor::Matrix;
use crate::inference::model::ModelState;
use crate::pipeline::output::Translation;

/// One unit of translation work.
///
/// After submission the mini batch belongs exclusively to the job; the
/// producer never touches it again. Jobs share only the immutable
/// model snapshot.
#[async_trait]
pub trait TranslationJob: Send + Sync + 'static {
    async fn run(&self, model: Arc<ModelState>, batch: MiniBatch);
}

/// The stand-in decoder.
///
/// Allocates per-job tensors from the shared device context on a
/// private stream token, runs the growth/collapse sequence the beam
/// search performs each step, and sends one [`Translation`] per
/// sentence to the output stage.
pub struct Decoder {
    ctx: Arc<DeviceContext>,
    output: mpsc::Sender<Translation>,
}

impl Decoder {
    pub fn new(ctx: Arc<DeviceContext>, output: mpsc::Sender<Translation>) -> Self {
        Self { ctx, output }
    }
}

#[async_trait]
impl TranslationJob for Decoder {
    async fn run(&self, model: Arc<ModelState>, batch: MiniBatch) {
        if batch.is_empty() {
            return;
        }

        let stream = StreamToken::new();
        debug!(
            stream = stream.id(),
            sentences = batch.len(),
            max_len = batch.max_len(),
            "Translating mini batch"
        );

        // Encoder states: one column block per source position, padded
        // to the longest sentence in the batch.
        let mut states = Matrix::with_dims(
            self.ctx.clone(),
            stream.clone(),
            batch.max_len().max(1),
            model.hidden_dim,
            1,
            batch.len(),
            true,
        );

        // Stub decode loop. A real implementation would, per step:
        // 1. expand the hypothesis states across the beam axis
        // 2. run the attention and output layers on the collapsed view
        // 3. prune hypotheses and shrink back within capacity
        states.resize(
            batch.max_len().max(1),
            model.hidden_dim,
            model.beam_size,
            batch.len(),
        );
        states.collapse_axes();
        debug!(states = states.describe(false), "Decode step complete");

        for sentence in batch.into_sentences() {
            let text = sentence
                .tokens()
                .iter()
                .map(|t| format!("w{t}"))
                .collect::<Vec<_>>()
                .join(" ");

            if self
                .output
                .send(Translation {
                    index: sentence.index(),
                    text,
                })
                .await
                .is_err()
            {
                warn!("Output stage gone, dropping remaining translations");
                return;
            }
        }
    }
}

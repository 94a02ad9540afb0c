//! gpu-translate: GPU-accelerated batched NMT inference runtime.
//!
//! The runtime core couples an accelerator-resident tensor memory
//! manager (growable 4-axis buffers with explicit resize, reshape, and
//! copy semantics) with a two-stage batching pipeline: input sentences
//! accumulate into maxi batches, are sorted by length, cut into mini
//! batches, and dispatched concurrently to translation jobs that share
//! one device allocator and an immutable model snapshot.

pub mod batch;
pub mod config;
pub mod gpu;
pub mod inference;
pub mod pipeline;

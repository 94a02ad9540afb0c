//! Accelerator memory management.
//!
//! - [`device`]: process-wide memory accounting and device discovery
//! - [`stream`]: execution stream tokens ordering transfers
//! - [`buffer`]: single-owner raw device regions
//! - [`tensor`]: growable 4-axis views over buffers

pub mod buffer;
pub mod device;
pub mod stream;
pub mod tensor;

//! Model state and translation jobs.
//!
//! - [`model`]: immutable shared model snapshot
//! - [`decoder`]: the translation job seam and the stand-in decoder

pub mod decoder;
pub mod model;

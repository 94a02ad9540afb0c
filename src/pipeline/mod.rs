//! Scheduling and output stages.
//!
//! - [`dispatcher`]: bounded worker pool dispatch
//! - [`output`]: reordering collector for completed translations

pub mod dispatcher;
pub mod output;

//! Batch formation.
//!
//! - [`sentence`]: input sentence records
//! - [`assembler`]: maxi batch accumulation and mini batch cutting

pub mod assembler;
pub mod sentence;

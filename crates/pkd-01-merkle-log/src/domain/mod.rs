//! # Domain Layer
//!
//! Pure logic: recency cutoffs, the hash tree, log records and errors.

pub mod cutoff;
pub mod entities;
pub mod errors;
pub mod tree;

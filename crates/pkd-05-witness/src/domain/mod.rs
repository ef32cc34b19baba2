//! # Domain Layer

pub mod cosignature;
pub mod errors;
pub mod hostname;
pub mod keys;

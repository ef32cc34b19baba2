//! # Domain Layer

pub mod action;
pub mod bundle;
pub mod envelope;
pub mod errors;
pub mod messages;
pub mod outcome;
pub mod policy;
pub mod revocation;

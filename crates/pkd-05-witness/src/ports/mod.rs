//! # Ports

pub mod inbound;

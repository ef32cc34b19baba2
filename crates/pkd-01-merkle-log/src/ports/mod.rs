//! # Ports Layer
//!
//! - `inbound`: the Merkle Log API and the leaf-transition seam
//! - `outbound`: storage, time and observability dependencies

pub mod inbound;
pub mod outbound;

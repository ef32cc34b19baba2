//! Cross-subsystem flows.

mod concurrency;
mod durability;
mod flows;

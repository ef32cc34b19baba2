//! Clock and observability adapters.

mod observer;
mod time;

pub use observer::TracingRecencyObserver;
pub use time::{ManualTimeSource, SystemTimeSource};

//! # Recency Cutoffs
//!
//! Given `n` accepted leaves, these return the smallest leaf id that is still
//! inside a staleness window. A client-cited root whose leaf id is below the
//! cutoff is too old to authorize a new action.

/// Below this many leaves the low-volume window accepts every root.
pub const LOW_VOLUME_THRESHOLD: u64 = 81;

/// Smallest leaf id inside the high-volume window: the newest half of the log.
pub fn high_volume_cutoff(n: u64) -> u64 {
    n / 2 + n % 2
}

/// Smallest leaf id inside the low-volume window.
///
/// `1` while `n < 81`, otherwise `n - ceil(2 * log2(n)^2)`.
pub fn low_volume_cutoff(n: u64) -> u64 {
    if n < LOW_VOLUME_THRESHOLD {
        return 1;
    }
    let log = (n as f64).log2();
    let window = (2.0 * log * log).ceil() as u64;
    n.saturating_sub(window)
}

//! Concrete location providers: a simulated receiver and a fixture replay.
//!
//! Both stream through a background thread per watch; clearing the watch
//! (or dropping the provider) stops and joins it.

pub mod error;
pub mod fixture;
pub mod simulated;
mod worker;

pub use error::ProviderError;
pub use fixture::FixtureProvider;
pub use simulated::{SimulatedProvider, TRACK, streamed_accuracy};

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the Unix epoch, 0 if the clock is before it.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

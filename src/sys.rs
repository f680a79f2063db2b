// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform-specific time types.
//!
//! Records are stamped with wall-clock time. On native platforms these types
//! come from `std::time`, while on WASM they come from `web_time`.

#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Nanoseconds since the unix epoch, saturating at zero for clocks set before 1970.
pub(crate) fn nanos_since_epoch(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

//! Delivery rate for frame subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants to see frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every frame the server streams
    Native,

    /// At most this many frames per second, keeping the latest
    Max(u32),
}

impl UpdateRate {
    /// Interval between deliveries, or `None` when no throttling applies.
    ///
    /// `Max(0)` is treated as `Native`.
    pub fn throttle_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals() {
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Max(0).throttle_interval(), None);
        assert_eq!(UpdateRate::Max(10).throttle_interval(), Some(Duration::from_millis(100)));
    }
}

use std::time::Duration;

pub const WORKER_COUNT: usize = 2;

/// How long a worker sits in the monitor once it gets in.
pub const HOLD_INTERVAL: Duration = Duration::from_secs(5);

/// Pause between failed attempts. The status line hardcodes "1 second".
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub hold: Duration,
    pub retry: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            hold: HOLD_INTERVAL,
            retry: RETRY_INTERVAL,
        }
    }
}

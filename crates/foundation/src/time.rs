use std::time::Duration;

/// Session clock reading in milliseconds.
///
/// Handlers receive the current reading from the caller instead of sampling a
/// wall clock, which keeps expiry logic deterministic under test.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub fn after(self, delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Millis(self.0.saturating_add(delay_ms))
    }

    pub fn since(self, earlier: Millis) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

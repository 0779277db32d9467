use std::time::Duration;

/// Decides whether a cached verdict may still be served.
///
/// Staleness is bucketed on the wall clock: `now` is floored to a multiple of
/// the window counted from the unix epoch, and a record is fresh iff it was
/// written at or after that boundary. Two lookups inside one bucket share the
/// cache however far apart they are, while the first lookup of the next bucket
/// refreshes even a seconds-old record.
///
/// Windows are applied in whole seconds. Anything under a second makes the
/// boundary `now` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    window: Duration,
}

impl FreshnessPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start of the bucket containing `now`.
    pub fn boundary(&self, now: i64) -> i64 {
        let window = i64::try_from(self.window.as_secs()).unwrap_or(i64::MAX);
        if window == 0 {
            return now;
        }
        now - now.rem_euclid(window)
    }

    pub fn is_fresh(&self, last_update: i64, now: i64) -> bool {
        last_update >= self.boundary(now)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10 * 60))
    }
}

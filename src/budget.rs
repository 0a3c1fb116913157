//! Wall-clock time budget shared by every blocking step of an analysis

use std::time::{Duration, Instant};

/// Deadline derived from a per-run budget.
///
/// Blocking steps poll `expired()` between units of work and use
/// `remaining()` as their wait timeout.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    limit: Duration,
}

impl TimeBudget {
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Budget from a seconds count, where 0 selects `default`
    pub fn from_secs(secs: u64, default: Duration) -> Self {
        if secs == 0 {
            Self::new(default)
        } else {
            Self::new(Duration::from_secs(secs))
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.elapsed() >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seconds_selects_default() {
        let budget = TimeBudget::from_secs(0, Duration::from_secs(120));
        assert_eq!(budget.limit(), Duration::from_secs(120));
        assert!(!budget.expired());

        let budget = TimeBudget::from_secs(7, Duration::from_secs(120));
        assert_eq!(budget.limit(), Duration::from_secs(7));
    }

    #[test]
    fn test_zero_limit_is_expired_immediately() {
        let budget = TimeBudget::new(Duration::ZERO);
        assert!(budget.expired());
        assert_eq!(budget.remaining(), Duration::ZERO);
    }
}

use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Bounded retry with a delay that grows linearly with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after `failed_attempts` consecutive failures, or `None`
    /// once the attempt budget is spent.
    pub fn delay_after(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts {
            return None;
        }
        Some(self.base_delay.saturating_mul(failed_attempts))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_delay_grows_with_attempts() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..5).filter_map(|n| policy.delay_after(n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(4),
            ]
        );
    }

    #[test]
    fn test_budget_exhausted() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_after(3), None);
        assert_eq!(policy.delay_after(100), None);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay_after(1), None);
    }

    #[test]
    fn test_no_delay_before_first_failure() {
        assert_eq!(RetryPolicy::default().delay_after(0), None);
    }
}

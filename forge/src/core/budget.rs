//! Time budget arithmetic for the run deadline and per-step timeouts.

use std::time::{Duration, Instant};

/// Time left until `deadline`, or `None` once it has passed.
pub fn remaining_budget(deadline: Instant, now: Instant) -> Option<Duration> {
    if now >= deadline {
        None
    } else {
        Some(deadline - now)
    }
}

/// Budget for the next step: the configured per-step timeout, clamped to the
/// time remaining on the overall deadline.
///
/// `None` means the deadline has already passed and the step must not start.
pub fn step_budget(
    deadline: Instant,
    now: Instant,
    step_timeout: Duration,
) -> Option<Duration> {
    remaining_budget(deadline, now).map(|remaining| remaining.min(step_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_budget_none_after_deadline() {
        let now = Instant::now();
        assert_eq!(remaining_budget(now, now), None);
        assert_eq!(remaining_budget(now, now + Duration::from_secs(1)), None);
        assert_eq!(
            remaining_budget(now + Duration::from_secs(5), now),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn step_budget_clamps_to_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(10);
        assert_eq!(
            step_budget(deadline, now, Duration::from_secs(300)),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            step_budget(deadline, now, Duration::from_secs(3)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(step_budget(now, now, Duration::from_secs(3)), None);
    }
}

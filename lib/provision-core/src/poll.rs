//! Bounded polling
//!
//! A poll probes a condition, sleeps a fixed interval between probes, and
//! stops after a number of attempts or once a deadline has passed. Probe
//! errors end the poll immediately; there is no retry on failure.

use crate::clock::Clock;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Limits of a polling loop
#[derive(Clone, Debug)]
pub struct PollPolicy {
    /// Time between two probes
    pub interval: Duration,
    /// Maximum number of probes
    pub max_attempts: Option<u32>,
    /// Maximum time spent polling
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    pub fn attempts(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
            deadline: None,
        }
    }

    pub fn deadline(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            deadline: Some(deadline),
        }
    }
}

/// How a poll ended when no probe failed
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Exhausted { attempts: u32, elapsed: Duration },
}

/// Probe until it yields a value, the attempts run out or the deadline passes.
///
/// The probe receives the 1-based attempt number and returns `Ok(None)` while
/// the condition does not hold yet.
pub async fn poll_until<F, Fut, T, E>(
    clock: &dyn Clock,
    policy: &PollPolicy,
    operation: &str,
    mut probe: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = clock.now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if let Some(value) = probe(attempt).await? {
            debug!(operation = %operation, attempt, "poll condition met");
            return Ok(PollOutcome::Ready(value));
        }

        let elapsed = clock.now().saturating_duration_since(start);
        let attempts_left = policy.max_attempts.map_or(true, |max| attempt < max);
        let remaining = match policy.deadline {
            Some(deadline) => deadline.saturating_sub(elapsed),
            None => policy.interval,
        };

        if !attempts_left || remaining.is_zero() {
            debug!(operation = %operation, attempt, ?elapsed, "poll exhausted");
            return Ok(PollOutcome::Exhausted {
                attempts: attempt,
                elapsed,
            });
        }

        debug!(operation = %operation, attempt, "condition not met, waiting");
        clock.sleep(policy.interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_ready_on_third_attempt() {
        let clock = ManualClock::new();
        let policy = PollPolicy::attempts(Duration::from_secs(2), 30);

        let outcome: Result<_, ()> = poll_until(&clock, &policy, "test", |attempt| async move {
            Ok((attempt == 3).then_some(attempt))
        })
        .await;

        assert_eq!(outcome, Ok(PollOutcome::Ready(3)));
        assert_eq!(clock.sleep_count(), 2);
        assert_eq!(clock.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let clock = ManualClock::new();
        let policy = PollPolicy::attempts(Duration::from_secs(2), 30);

        let outcome: Result<PollOutcome<()>, ()> =
            poll_until(&clock, &policy, "test", |_| async { Ok(None) }).await;

        match outcome {
            Ok(PollOutcome::Exhausted { attempts, .. }) => assert_eq!(attempts, 30),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(clock.sleep_count(), 29);
    }

    #[tokio::test]
    async fn test_deadline_bounds_total_wait() {
        let clock = ManualClock::new();
        let policy = PollPolicy::deadline(Duration::from_secs(10), Duration::from_secs(25));

        let outcome: Result<PollOutcome<()>, ()> =
            poll_until(&clock, &policy, "test", |_| async { Ok(None) }).await;

        match outcome {
            Ok(PollOutcome::Exhausted { elapsed, .. }) => {
                assert_eq!(elapsed, Duration::from_secs(25))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        // Sleeps of 10, 10 and the remaining 5
        assert_eq!(clock.sleep_count(), 3);
    }

    #[tokio::test]
    async fn test_probe_error_stops_immediately() {
        let clock = ManualClock::new();
        let policy = PollPolicy::attempts(Duration::from_secs(2), 30);

        let outcome: Result<PollOutcome<()>, String> = poll_until(&clock, &policy, "test", |_| async {
            Err("connection refused".to_string())
        })
        .await;

        assert_eq!(outcome, Err("connection refused".to_string()));
        assert_eq!(clock.sleep_count(), 0);
    }
}

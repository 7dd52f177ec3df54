//! Retry with capped exponential backoff
//!
//! Orchestration code wraps flaky operations (disk I/O today, RPC calls if a
//! live ledger is plugged in) with [`retry`] or [`retry_async`]. The
//! treasury itself never retries: a retried top-up must start from a fresh
//! balance snapshot, which only the caller can take.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Backoff settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub base_delay_ms: u64,
    /// Cap on a single delay
    pub max_delay_ms: u64,
    /// Cap on the sum of all delays; retrying stops once it would be exceeded
    pub max_total_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            max_total_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Delays between attempts, honouring both caps
    pub fn schedule(&self) -> Vec<Duration> {
        let mut total = 0u64;
        let mut delays = Vec::new();
        for attempt in 0..self.max_attempts.saturating_sub(1) {
            let delay = self.delay_for(attempt);
            let ms = delay.as_millis() as u64;
            match total.checked_add(ms) {
                Some(next) if next <= self.max_total_delay_ms => total = next,
                _ => break,
            }
            delays.push(delay);
        }
        delays
    }
}

/// Run `op` until it succeeds or the schedule is exhausted, blocking the
/// thread between attempts. Returns the last error.
pub fn retry<T, E, F>(config: &RetryConfig, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let mut delays = config.schedule().into_iter();
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => match delays.next() {
                Some(delay) => {
                    log::warn!(
                        "{} failed (attempt {}): {}; retrying in {:?}",
                        label,
                        attempt,
                        err,
                        delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                None => {
                    log::error!("{} failed after {} attempt(s): {}", label, attempt, err);
                    return Err(err);
                }
            },
        }
    }
}

/// Async variant of [`retry`]; sleeps on the tokio timer
pub async fn retry_async<T, E, F, Fut>(config: &RetryConfig, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut delays = config.schedule().into_iter();
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match delays.next() {
                Some(delay) => {
                    log::warn!(
                        "{} failed (attempt {}): {}; retrying in {:?}",
                        label,
                        attempt,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    log::error!("{} failed after {} attempt(s): {}", label, attempt, err);
                    return Err(err);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
            max_total_delay_ms: 100,
        }
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(4), Duration::from_millis(1_600));
        assert_eq!(config.delay_for(5), Duration::from_millis(2_000));
        assert_eq!(config.delay_for(200), Duration::from_millis(2_000));
    }

    #[test]
    fn test_schedule_with_huge_delays_stops_instead_of_overflowing() {
        let config = RetryConfig {
            max_attempts: 4,
            base_delay_ms: 1 << 63,
            max_delay_ms: u64::MAX,
            max_total_delay_ms: u64::MAX,
        };
        assert_eq!(config.schedule(), vec![Duration::from_millis(1 << 63)]);
    }

    #[test]
    fn test_schedule_respects_total_cap() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            max_total_delay_ms: 1_000,
        };
        // 100 + 200 + 400 = 700; adding 800 would exceed 1000.
        let schedule = config.schedule();
        assert_eq!(schedule.len(), 3);
        assert!(RetryConfig::none().schedule().is_empty());
    }

    #[test]
    fn test_retry_succeeds_after_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = retry(&fast(5), "op", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("transient".to_string())
            } else {
                Ok(calls.get())
            }
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_gives_up() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry(&fast(3), "op", || {
            calls.set(calls.get() + 1);
            Err(format!("failure {}", calls.get()))
        });

        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_async() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result: Result<u32, String> = retry_async(&fast(4), "op", || {
            let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }
}

//! Request-rate governor shared by every fetch in the process
//!
//! This module handles:
//! - Admitting at most N requests per sliding time window
//! - Making callers wait (never fail) when the quota is used up
//! - Admitting waiting callers in arrival order

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window admission gate
///
/// The governor keeps the instants of the admissions still inside the window.
/// A caller that finds the window full keeps the lock and sleeps until the
/// oldest admission expires; since `tokio::sync::Mutex` is fair, other callers
/// queue behind it and are admitted in the order they arrived.
///
/// Build one per process and share it through an `Arc`.
#[derive(Debug)]
pub struct RateGovernor {
    /// Maximum admissions per window
    capacity: usize,

    /// Window length, including any tolerance margin
    window: Duration,

    /// Admission instants, oldest first
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateGovernor {
    /// Creates a governor admitting `capacity` requests per `window`
    ///
    /// A capacity of zero is treated as one so callers can always make progress.
    pub fn new(capacity: usize, window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window,
            admissions: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Creates a governor from configuration
    ///
    /// The tolerance margin is added to the window so that clock skew between
    /// us and the provider never lets a request land inside the provider's
    /// previous window.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_secs + config.tolerance_secs);
        Self::new(config.max_requests as usize, window)
    }

    /// Returns the maximum number of admissions per window
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the effective window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits until a request may be sent, then records the admission
    pub async fn acquire(&self) {
        let mut admissions = self.admissions.lock().await;

        loop {
            let now = Instant::now();
            while admissions
                .front()
                .is_some_and(|admitted| now.duration_since(*admitted) >= self.window)
            {
                admissions.pop_front();
            }

            if admissions.len() < self.capacity {
                admissions.push_back(now);
                tracing::trace!(
                    "Request admitted ({}/{} in window)",
                    admissions.len(),
                    self.capacity
                );
                return;
            }

            if let Some(oldest) = admissions.front().copied() {
                let ready_at = oldest + self.window;
                tracing::info!(
                    "Request quota of {} per {:?} reached, waiting {:?}",
                    self.capacity,
                    self.window,
                    ready_at.saturating_duration_since(now)
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }

    /// Returns how many admissions are still inside the current window
    pub async fn admitted_in_window(&self) -> usize {
        let admissions = self.admissions.lock().await;
        let now = Instant::now();
        admissions
            .iter()
            .filter(|admitted| now.duration_since(**admitted) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_capacity_immediately() {
        let governor = RateGovernor::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..3 {
            governor.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(governor.admitted_in_window().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_window_to_slide() {
        let governor = RateGovernor::new(2, Duration::from_secs(10));
        let start = Instant::now();

        governor.acquire().await;
        governor.acquire().await;
        governor.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_exceeds_capacity() {
        let capacity = 15;
        let window = Duration::from_secs(15 * 60);
        let governor = RateGovernor::new(capacity, window);

        let mut admitted = Vec::new();
        for _ in 0..50 {
            governor.acquire().await;
            admitted.push(Instant::now());
        }

        // Any capacity + 1 consecutive admissions must span at least one window
        for pair in admitted.windows(capacity + 1) {
            assert!(pair[capacity].duration_since(pair[0]) >= window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_order_is_fifo() {
        let governor = Arc::new(RateGovernor::new(1, Duration::from_secs(1)));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let governor = governor.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                governor.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Let the task reach the governor before spawning the next one
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_from_config_adds_tolerance() {
        let config = RateLimitConfig {
            max_requests: 15,
            window_secs: 900,
            tolerance_secs: 5,
        };
        let governor = RateGovernor::from_config(&config);
        assert_eq!(governor.capacity(), 15);
        assert_eq!(governor.window(), Duration::from_secs(905));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let governor = RateGovernor::new(0, Duration::from_secs(1));
        assert_eq!(governor.capacity(), 1);
    }
}

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use redpost_core::SafetySettings;

/// Added on top of the computed wait so the oldest request is guaranteed
/// to have left the window when we wake up.
const WAIT_BUFFER: Duration = Duration::from_secs(1);

/// Rolling-window limiter: at most `max_requests` within any `window`.
/// Every API call acquires before sending; when the window is full the
/// caller sleeps until the oldest request expires.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1) as usize,
            window,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_settings(settings: &SafetySettings) -> Self {
        Self::new(settings.max_requests_per_minute, settings.request_window)
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut requests = self.requests.lock().await;
                let now = Instant::now();
                while requests
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    requests.pop_front();
                }

                if requests.len() < self.max_requests {
                    requests.push_back(now);
                    debug!(
                        in_window = requests.len(),
                        max = self.max_requests,
                        "rate limit permit acquired"
                    );
                    None
                } else if let Some(oldest) = requests.front() {
                    Some(self.window - now.duration_since(*oldest) + WAIT_BUFFER)
                } else {
                    None
                }
            };

            match wait {
                None => return,
                Some(duration) => {
                    warn!(?duration, "request window full, waiting");
                    sleep(duration).await;
                }
            }
        }
    }

    pub async fn status(&self) -> RateLimitStatus {
        let mut requests = self.requests.lock().await;
        let now = Instant::now();
        while requests
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            requests.pop_front();
        }

        RateLimitStatus {
            current_window_requests: requests.len() as u32,
            max_requests: self.max_requests as u32,
            window: self.window,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub current_window_requests: u32,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitStatus {
    pub fn requests_remaining(&self) -> u32 {
        self.max_requests.saturating_sub(self.current_window_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn window_count_never_exceeds_ceiling() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));

        for _ in 0..5 {
            limiter.acquire().await;
        }

        let status = limiter.status().await;
        assert_eq!(status.current_window_requests, 5);
        assert_eq!(status.requests_remaining(), 5);
        assert!(status.current_window_requests <= status.max_requests);
    }

    #[tokio::test]
    async fn full_window_blocks_until_oldest_expires() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        // Third acquisition had to wait for the first to leave the window.
        assert!(start.elapsed() >= Duration::from_millis(100));
        let status = limiter.status().await;
        assert!(status.current_window_requests <= 2);
    }

    #[tokio::test]
    async fn old_requests_are_pruned() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50));

        limiter.acquire().await;
        limiter.acquire().await;
        sleep(Duration::from_millis(80)).await;

        let status = limiter.status().await;
        assert_eq!(status.current_window_requests, 0);
        assert_eq!(status.requests_remaining(), 2);
    }
}

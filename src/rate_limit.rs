//! Per-address fixed-window throttling.
//!
//! 30 requests per 10 second window, keyed by client IP. This is a
//! fairness safeguard, not a security boundary: the window is coarse
//! and counters live in process memory.

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;

use crate::{error::AppError, state::State as AppState};

pub const WINDOW_SECS: u64 = 10;
pub const MAX_REQUESTS: u32 = 30;

struct Window {
    started: Instant,
    count: u32,
}

pub struct FixedWindowLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(WINDOW_SECS), MAX_REQUESTS)
    }

    /// Admit or reject one request from `addr`. Resets are time-based:
    /// the first request after a window expires starts a fresh one.
    pub async fn check(&self, addr: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        // drop long-expired windows so the map stays bounded
        windows.retain(|_, w| now.duration_since(w.started) < self.window * 2);

        let entry = windows.entry(addr).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }
}

/// Runs before every handler; rejected requests never reach the store.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.limiter.check(addr.ip()).await {
        return Err(AppError::RateLimited);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[tokio::test]
    async fn admits_up_to_the_limit_then_rejects() {
        let limiter = FixedWindowLimiter::with_defaults();

        for _ in 0..MAX_REQUESTS {
            assert!(limiter.check(ip(1)).await);
        }

        // request 31 inside the window
        assert!(!limiter.check(ip(1)).await);
    }

    #[tokio::test]
    async fn addresses_do_not_share_windows() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(10), 1);

        assert!(limiter.check(ip(1)).await);
        assert!(!limiter.check(ip(1)).await);
        assert!(limiter.check(ip(2)).await);
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let limiter = FixedWindowLimiter::new(Duration::from_millis(40), 2);

        assert!(limiter.check(ip(1)).await);
        assert!(limiter.check(ip(1)).await);
        assert!(!limiter.check(ip(1)).await);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(limiter.check(ip(1)).await);
    }
}

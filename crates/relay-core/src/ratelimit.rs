//! C1 — Rate limiter.
//!
//! `acquire(tier)` blocks the caller until the minimum interval for that
//! tier has elapsed since the tier's last acquire. `sleep_for_flood_wait`
//! handles a server-directed flood-wait without gating any other tier,
//! per §4.1: "during such a sleep no other tier is gated".
//!
//! Grounded on `skynet-channels::manager::ChannelManager::connect_with_backoff`'s
//! jitter style, generalized from "per-channel reconnect backoff" to
//! "per-tier minimum call interval".

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// A named rate-limit tier. New tiers can be added without touching the
/// limiter's core logic — only the config needs a matching interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    ApiRead,
    ApiWrite,
}

impl Tier {
    fn interval(self, cfg: &RateLimitConfig) -> Duration {
        match self {
            Tier::ApiRead => Duration::from_millis(cfg.api_read_interval_ms),
            Tier::ApiWrite => Duration::from_millis(cfg.api_write_interval_ms),
        }
    }
}

struct State {
    last_call: HashMap<Tier, Instant>,
    flood_until: Option<Instant>,
}

/// Single-process rate limiter. Concurrent callers serialize on an
/// internal mutex (§4.1: "single-process only; concurrent callers
/// serialize on a mutex").
pub struct RateLimiter {
    cfg: RateLimitConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State {
                last_call: HashMap::new(),
                flood_until: None,
            }),
        }
    }

    /// Block until `tier`'s minimum interval has elapsed since its last
    /// acquire. If a flood-wait sleep is in progress for any tier, this
    /// call is unaffected — only `sleep_for_flood_wait`'s own caller is
    /// gated.
    pub async fn acquire(&self, tier: Tier) {
        let wait = {
            let mut state = self.state.lock().expect("rate limiter mutex poisoned");
            let interval = tier.interval(&self.cfg);
            let now = Instant::now();
            let wait = match state.last_call.get(&tier) {
                Some(last) => {
                    let elapsed = now.saturating_duration_since(*last);
                    interval.saturating_sub(elapsed)
                }
                None => Duration::ZERO,
            };
            state.last_call.insert(tier, now + wait);
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Sleep for a server-directed flood-wait duration. `seconds` beyond
    /// the configured cap is not slept through — the caller should
    /// surface `RateLimited` instead (§6 rate-limit directives,
    /// §8 boundary: "N > 60 is reported as RateLimited to the caller").
    pub async fn sleep_for_flood_wait(&self, seconds: u64) -> Result<(), u64> {
        if seconds > self.cfg.flood_wait_max_secs {
            return Err(seconds);
        }
        let until = {
            let mut state = self.state.lock().expect("rate limiter mutex poisoned");
            let until = Instant::now() + Duration::from_secs(seconds);
            state.flood_until = Some(until);
            until
        };
        tokio::time::sleep_until(until).await;
        let mut state = self.state.lock().expect("rate limiter mutex poisoned");
        if state.flood_until == Some(until) {
            state.flood_until = None;
        }
        Ok(())
    }
}

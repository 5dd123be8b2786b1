//! Shared per-host pacing gate
//!
//! All outbound requests funnel through one gate so the polite inter-request
//! delay holds across every caller, no matter how many workers are running.
//! Callers reserve the next free slot for their host and sleep until it;
//! concurrent callers therefore queue rather than burst.
//!
//! The gate is an owned component injected into the fetch client, never a
//! global, so tests can substitute a zero-delay gate.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct PacingGate {
    min_delay: Duration,
    /// Most recently reserved slot per host
    slots: Mutex<HashMap<String, Instant>>,
}

impl PacingGate {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// A gate that never waits, for tests.
    pub fn zero_delay() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until this caller's turn for `host` comes up.
    ///
    /// Reserves the slot before sleeping, so each concurrent caller gets a
    /// distinct slot spaced `min_delay` after the previous one.
    pub async fn wait_turn(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        let slot = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            let slot = match slots.get(host) {
                Some(prev) => (*prev + self.min_delay).max(now),
                None => now,
            };
            slots.insert(host.to_string(), slot);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

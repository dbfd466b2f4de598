//! Cognitive Sever: a sliding-window strike counter that, once tripped,
//! forces every subsequent evaluation to BLOCK_SEVER regardless of payload
//! until a cooldown elapses.

use std::collections::VecDeque;
use std::time::Duration;

pub struct CognitiveSever {
    enabled: bool,
    strike_max: usize,
    strike_window: Duration,
    sever_duration: Duration,
    strikes: VecDeque<Duration>,
    sever_until: Option<Duration>,
}

impl CognitiveSever {
    pub fn new(
        enabled: bool,
        strike_max: u32,
        strike_window_secs: u64,
        sever_duration_secs: u64,
    ) -> Self {
        Self {
            enabled,
            strike_max: strike_max as usize,
            strike_window: Duration::from_secs(strike_window_secs),
            sever_duration: Duration::from_secs(sever_duration_secs),
            strikes: VecDeque::new(),
            sever_until: None,
        }
    }

    /// True if the firewall is currently in the SEVERED state at time `now`.
    /// A cooldown that has elapsed clears itself lazily here.
    pub fn is_severed(&mut self, now: Duration) -> bool {
        match self.sever_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.sever_until = None;
                false
            }
            None => false,
        }
    }

    /// Records the outcome of one evaluation. Call after every evaluation
    /// that actually consulted the pipeline (not while already SEVERED).
    pub fn record(&mut self, now: Duration, blocked: bool) {
        if !self.enabled || !blocked {
            return;
        }
        self.strikes.push_back(now);
        while let Some(&front) = self.strikes.front() {
            if now.saturating_sub(front) > self.strike_window {
                self.strikes.pop_front();
            } else {
                break;
            }
        }
        if self.strikes.len() >= self.strike_max {
            let until = now + self.sever_duration;
            tracing::warn!(
                target: "firewall-core",
                strikes = self.strikes.len(),
                sever_duration_secs = self.sever_duration.as_secs(),
                "cognitive sever tripped"
            );
            self.sever_until = Some(until);
        }
    }
}

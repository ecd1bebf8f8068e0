//! Once-per-second countdown.
//!
//! The tick task only publishes the remaining seconds on a watch channel.
//! Reacting to zero is the observer's job, gated by [`ExpiryLatch`], so a
//! slow reaction can never be re-triggered by later ticks.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Countdown {
    remaining: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn start(seconds: u64) -> Self {
        let (tx, rx) = watch::channel(seconds);
        let task = tokio::spawn(async move {
            if seconds == 0 {
                return;
            }
            let started = Instant::now();
            let mut ticker = interval_at(started + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                // Derived from the start instant so a stalled runtime cannot stretch the deadline.
                let left = seconds.saturating_sub(started.elapsed().as_secs());
                if tx.send(left).is_err() || left == 0 {
                    break;
                }
            }
        });
        Self { remaining: rx, task }
    }

    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// A fresh receiver; the current value counts as already seen.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        let mut rx = self.remaining.clone();
        rx.borrow_and_update();
        rx
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fires at most once, the first time it observes zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpiryLatch {
    fired: bool,
}

impl ExpiryLatch {
    pub fn observe(&mut self, remaining: u64) -> bool {
        if remaining == 0 && !self.fired {
            self.fired = true;
            return true;
        }
        false
    }
}

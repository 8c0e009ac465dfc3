//! Cancellable timers owned by the manager task
//!
//! Both timers are polled from the manager's `select!` loop. An unarmed
//! timer never completes; cancelling is always safe, armed or not.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};

/// One-shot reconnect timer
#[derive(Default)]
pub(crate) struct RetryTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl RetryTimer {
    /// Arm the timer, replacing any pending firing
    pub fn schedule(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(sleep(delay)));
    }

    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    /// Completes once when the armed delay elapses, then disarms
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending().await,
        }
    }
}

/// Periodic keepalive timer. The first tick comes one full period after `start`.
pub(crate) struct KeepaliveTimer {
    period: Duration,
    interval: Option<Interval>,
}

impl KeepaliveTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn cancel(&mut self) {
        self.interval = None;
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending().await,
        }
    }
}

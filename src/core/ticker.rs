//! Tick sources for the scheduler.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Source of sweep ticks.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick; `None` once the ticker is closed.
    async fn tick(&mut self) -> Option<Instant>;

    /// Stop producing ticks.
    fn stop(&mut self);
}

/// Wall-clock ticker.
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    interval: Option<Interval>,
    stopped: bool,
}

impl IntervalTicker {
    /// Tick every `period`, first tick one period after the first wait. Ticks
    /// missed while a sweep runs are skipped, not replayed.
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
            stopped: false,
        }
    }

    /// Configured period.
    pub const fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> Option<Instant> {
        if self.stopped {
            return None;
        }
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        Some(interval.tick().await)
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.interval = None;
    }
}

/// Ticker fired by hand through its [`TickHandle`].
#[derive(Debug)]
pub struct ManualTicker {
    rx: mpsc::Receiver<Instant>,
}

/// Sending side of a [`ManualTicker`]. Dropping every handle closes the ticker.
#[derive(Debug, Clone)]
pub struct TickHandle {
    tx: mpsc::Sender<Instant>,
}

impl ManualTicker {
    /// Create a ticker and its handle.
    pub fn channel() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::channel(1);
        (Self { rx }, TickHandle { tx })
    }
}

impl TickHandle {
    /// Fire one tick; returns `false` if the ticker is gone.
    pub async fn tick(&self) -> bool {
        self.tx.send(Instant::now()).await.is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> Option<Instant> {
        self.rx.recv().await
    }

    fn stop(&mut self) {
        self.rx.close();
    }
}

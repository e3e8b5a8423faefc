use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::scheduler::TaskSlot;

/// Periodic background pull.
///
/// The first tick happens one full interval after `start`. Ticks never
/// overlap: the next interval starts counting once the previous tick's
/// future has finished.
#[derive(Default)]
pub struct PullTicker {
    slot: TaskSlot,
}

impl PullTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking, replacing a running ticker.
    pub fn start<F, Fut>(&self, interval: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let interval = interval.max(Duration::from_millis(1));
        self.slot.run(async move {
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if !tick().await {
                    tracing::debug!("pull ticker stopped by its tick");
                    break;
                }
            }
        });
    }

    pub fn stop(&self) -> bool {
        self.slot.cancel()
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_pending()
    }
}

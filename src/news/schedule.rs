// src/news/schedule.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::NewsFeedWidget;

/// Owned handle to the periodic news refresh. Dropping it cancels the task.
#[derive(Debug)]
pub struct RefreshSchedule {
    handle: JoinHandle<()>,
    every: Duration,
}

impl RefreshSchedule {
    pub fn every(&self) -> Duration {
        self.every
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshSchedule {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Refresh once right away, then every `every`. A failed refresh is already
/// rendered by the widget and never stops the loop.
pub fn spawn_schedule(widget: Arc<NewsFeedWidget>, every: Duration) -> RefreshSchedule {
    let every = every.max(Duration::from_millis(1));
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let state = widget.refresh().await;
            tracing::debug!(target: "news", ?state, "scheduled refresh tick");
        }
    });
    RefreshSchedule { handle, every }
}

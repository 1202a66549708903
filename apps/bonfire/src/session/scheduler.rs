use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Whether the scheduler should arm another tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// Repeating timer driving sync ticks.
///
/// Ticks are serialized: the task awaits each tick's future before waiting
/// for the next timer fire, and a fire that lands while a tick is still
/// running is delayed rather than queued up. `stop` never aborts an
/// in-flight tick; the pending tick drains and the loop then exits.
pub struct PollScheduler {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl PollScheduler {
    pub fn start<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickFlow> + Send + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    // Shutdown wins when both are ready.
                    biased;
                    _ = signal.notified() => break,
                    _ = ticker.tick() => {
                        if tick().await == TickFlow::Stop {
                            break;
                        }
                    }
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Cancels the timer; no new tick is armed after the pending one
    /// drains. Calling it on an already-stopped scheduler is a no-op.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::AppId;

/// Emitted when a countdown runs out. `generation` identifies which arming
/// produced it so that a restart or stop racing the timer can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownExpired {
    pub app_id: AppId,
    pub generation: u64,
}

/// One-shot timer owned by an application. Restarting cancels the previous
/// arming; dropping the handle cancels it too. Timers run on `runtime`, so
/// the countdown can be armed from any thread.
pub struct Countdown {
    runtime: Handle,
    app_id: AppId,
    duration: Duration,
    expired_tx: mpsc::UnboundedSender<CountdownExpired>,
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl Countdown {
    pub fn new(
        runtime: Handle,
        app_id: AppId,
        duration: Duration,
        expired_tx: mpsc::UnboundedSender<CountdownExpired>,
    ) -> Self {
        Self {
            runtime,
            app_id,
            duration,
            expired_tx,
            generation: 0,
            cancel: None,
        }
    }

    /// (Re)arm the timer.
    pub fn start(&mut self) {
        self.stop();
        let token = CancellationToken::new();
        let event = CountdownExpired {
            app_id: self.app_id,
            generation: self.generation,
        };
        let duration = self.duration;
        let tx = self.expired_tx.clone();
        let cancelled = token.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    let _ = tx.send(event);
                }
                _ = cancelled.cancelled() => {}
            }
        });
        self.cancel = Some(token);
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    /// True when `event` came from the arming that is still active.
    pub fn is_current(&self, event: &CountdownExpired) -> bool {
        self.is_armed() && event.app_id == self.app_id && event.generation == self.generation
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

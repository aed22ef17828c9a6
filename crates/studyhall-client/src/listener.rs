//! Change-notification listener.
//!
//! A [`Subscription`] owns a task that drains a change-feed receiver and
//! invokes a callback for every event matching its [`Channel`].  The
//! callback gets no payload: subscribers re-fetch.  Dropping the handle
//! aborts the task.

use std::future::Future;

use studyhall_shared::{ChangeEvent, Channel};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Start listening on `rx`. The callback returns `false` to stop.
    ///
    /// A lagged receiver has missed events of unknown kind, so lag counts
    /// as a change.
    pub fn spawn<F, Fut>(
        channel: Channel,
        mut rx: broadcast::Receiver<ChangeEvent>,
        on_change: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let table = channel.table.as_str();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if channel.matches(&event) => {
                        debug!(table, kind = ?event.kind, row = %event.row_id, "Change received");
                        if !on_change().await {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(table, skipped, "Change feed lagged, reloading");
                        if !on_change().await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!(table, "Change feed closed");
                        break;
                    }
                }
            }
        });

        Self { handle }
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

//! Background notification worker.
//!
//! The barrier path hands notifications to a bounded queue and moves on.
//! A single task owns the receiving end and routes events in order.
//!
//! ```text
//! ┌──────────────┐  try_send   ┌─────────────┐        ┌──────────────────┐
//! │ Access flows │────────────►│ mpsc queue  │───────►│ NotificationRouter│
//! └──────────────┘             └─────────────┘        └──────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::error::{NotifyError, Result};
use crate::event::Notification;
use crate::router::NotificationRouter;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Queue capacity before new events are rejected.
    pub capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl WorkerConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

enum Command {
    Dispatch(Notification),
    Flush(oneshot::Sender<()>),
}

/// Sending side of the worker queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatch(n) => f.debug_tuple("Dispatch").field(&n.kind).finish(),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl NotifierHandle {
    /// Queue a notification without waiting.
    pub fn enqueue(&self, notification: Notification) -> Result<()> {
        match self.tx.try_send(Command::Dispatch(notification)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(Command::Dispatch(n))) => {
                warn!(kind = %n.kind, "Notification queue full, event dropped");
                Err(NotifyError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(NotifyError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(NotifyError::WorkerStopped),
        }
    }

    /// Wait until every notification queued before this call was routed.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .await
            .map_err(|_| NotifyError::WorkerStopped)?;
        ack_rx.await.map_err(|_| NotifyError::WorkerStopped)
    }
}

/// Owns the worker task.
pub struct NotificationWorker {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl NotificationWorker {
    pub fn spawn(router: Arc<NotificationRouter>, config: WorkerConfig) -> (Self, NotifierHandle) {
        let (tx, mut rx) = mpsc::channel(config.capacity.max(1));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        // Finish what was already accepted.
                        rx.close();
                        while let Some(command) = rx.recv().await {
                            Self::handle(&router, command).await;
                        }
                        break;
                    }
                    command = rx.recv() => match command {
                        Some(command) => Self::handle(&router, command).await,
                        None => break,
                    },
                }
            }
        });

        (
            Self {
                stop: Some(stop_tx),
                task,
            },
            NotifierHandle { tx },
        )
    }

    async fn handle(router: &NotificationRouter, command: Command) {
        match command {
            Command::Dispatch(notification) => {
                let kind = notification.kind;
                if let Err(e) = router.dispatch(notification).await {
                    error!(%kind, error = %e, "Failed to route notification");
                }
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    /// Stop accepting events, route the ones already queued, then stop.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "Notification worker ended abnormally");
        }
    }
}

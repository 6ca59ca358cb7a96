//! Periodic quiet hours drain.

use chrono::{Local, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::drain::DrainReport;
use crate::error::Result;
use crate::quiet_hours;
use crate::router::NotificationRouter;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between two checks.
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl SchedulerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Drains the queue once quiet hours are over.
pub struct DrainScheduler {
    router: Arc<NotificationRouter>,
    config: SchedulerConfig,
}

impl DrainScheduler {
    pub fn new(router: Arc<NotificationRouter>, config: SchedulerConfig) -> Self {
        Self { router, config }
    }

    /// One check at local time `now`. Returns the drain report when a drain
    /// ran.
    pub async fn tick_at(&self, now: NaiveTime) -> Result<Option<DrainReport>> {
        let settings = self.router.settings().await?;
        if quiet_hours::is_active(now, &settings.quiet_hours) {
            debug!("Quiet hours active, drain deferred");
            return Ok(None);
        }
        if self.router.pending_count().await? == 0 {
            return Ok(None);
        }
        self.router.drain().await.map(Some)
    }

    pub async fn tick(&self) -> Result<Option<DrainReport>> {
        self.tick_at(Local::now().time()).await
    }

    /// Run the tick loop on a background task until the handle is shut down.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = self.config.interval.as_secs(), "Drain scheduler started");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => match self.tick().await {
                        Ok(Some(report)) => info!(
                            sent = report.sent,
                            failed = report.failed,
                            "Scheduled drain finished"
                        ),
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "Scheduled drain failed"),
                    },
                }
            }
            info!("Drain scheduler stopped");
        });

        SchedulerHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

pub struct SchedulerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for an in-flight tick to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "Drain scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Notification;
    use crate::router::tests::{at, router_with_quiet_hours};
    use plategate_core::NotificationKind;

    #[tokio::test]
    async fn test_tick_waits_for_end_of_quiet_hours() {
        let (router, channel) = router_with_quiet_hours(true).await;
        router
            .dispatch_at(
                Notification::new(NotificationKind::UnknownVehicle, "Unknown vehicle"),
                at(23, 0),
            )
            .await
            .unwrap();
        let scheduler = DrainScheduler::new(Arc::new(router), SchedulerConfig::default());

        assert_eq!(scheduler.tick_at(at(3, 0)).await.unwrap(), None);
        assert_eq!(channel.attempt_count(), 0);

        let report = scheduler.tick_at(at(7, 30)).await.unwrap().unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(channel.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_tick_without_pending_does_nothing() {
        let (router, channel) = router_with_quiet_hours(true).await;
        let scheduler = DrainScheduler::new(Arc::new(router), SchedulerConfig::default());

        assert_eq!(scheduler.tick_at(at(12, 0)).await.unwrap(), None);
        assert_eq!(channel.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_spawned_scheduler_shuts_down() {
        let (router, _) = router_with_quiet_hours(false).await;
        let handle = DrainScheduler::new(
            Arc::new(router),
            SchedulerConfig::default().with_interval(Duration::from_millis(10)),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown().await;
    }
}

use chrono::{DateTime, Utc};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use std::sync::Arc;

use crate::constants::OUTBOX_SWEEP_BATCH;
use crate::errors::Result;

use super::delivery::{DeliveryQueue, DeliveryTask};
use super::notifications_repository::OutboxRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxRunStats {
    pub dispatched: usize,
    pub failed: usize,
}

/// Reads committed pending markers and pushes delivery tasks to the
/// broker. A marker only flips to dispatched after a successful enqueue,
/// so a broker outage leaves it pending for the next boundary or sweep.
pub struct OutboxDispatcher {
    outbox: OutboxRepository,
    queue: Arc<dyn DeliveryQueue>,
}

impl OutboxDispatcher {
    pub fn new(queue: Arc<dyn DeliveryQueue>) -> Self {
        Self {
            outbox: OutboxRepository::new(),
            queue,
        }
    }

    /// Called right after a transaction that wrote markers commits.
    pub async fn run_after_commit(
        &self,
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> Result<OutboxRunStats> {
        self.dispatch_due(conn, now).await
    }

    /// Periodic safety net: stragglers from broker failures and deferred
    /// markers whose quiet/cadence window has elapsed.
    pub async fn sweep(
        &self,
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> Result<OutboxRunStats> {
        let stats = self.dispatch_due(conn, now).await?;
        if stats.dispatched > 0 || stats.failed > 0 {
            debug!(
                "Outbox sweep dispatched {} markers ({} enqueue failures)",
                stats.dispatched, stats.failed
            );
        }
        Ok(stats)
    }

    async fn dispatch_due(
        &self,
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> Result<OutboxRunStats> {
        let mut stats = OutboxRunStats::default();
        let due = self.outbox.due_pending(conn, now.naive_utc(), OUTBOX_SWEEP_BATCH)?;

        for marker in due {
            let task = DeliveryTask {
                notification_id: marker.notification_id.clone(),
            };
            match self.queue.enqueue(task).await {
                Ok(()) => {
                    self.outbox
                        .mark_dispatched(conn, &marker.notification_id, now.naive_utc())?;
                    stats.dispatched += 1;
                }
                Err(e) => {
                    // Marker stays pending; retried at the next boundary.
                    self.outbox.record_attempt(conn, &marker.notification_id)?;
                    warn!(
                        "Enqueue failed for notification {} (attempt {}): {}",
                        marker.notification_id,
                        marker.attempts + 1,
                        e
                    );
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}

//! Background task that periodically drops expired booking drafts and their idle locks.

use std::sync::Arc;
use std::time::Duration;

use arboreal_order::BookingManager;
use tokio::task::JoinHandle;

pub fn start_draft_sweeper(bookings: Arc<BookingManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = every.as_secs(), "Draft sweeper started");
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            match bookings.sweep().await {
                Ok(report) if report.purged_drafts > 0 || report.released_locks > 0 => {
                    tracing::debug!(
                        purged = report.purged_drafts,
                        released = report.released_locks,
                        "Swept expired drafts"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Draft sweep failed"),
            }
        }
    })
}

use std::sync::Arc;
use std::time::Duration;

use arboreal_core::pms::PmsClient;
use arboreal_order::{BookingManager, DraftRepository};
use arboreal_store::app_config::ResiliencyConfig;
use chrono::NaiveDate;

use crate::middleware::resiliency::CircuitBreaker;

pub struct ResiliencyState {
    pub pms_cb: CircuitBreaker,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub resiliency: Arc<ResiliencyState>,
    /// Overrides the local date, for tests.
    pub fixed_today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn DraftRepository>,
        pms: Arc<dyn PmsClient>,
        resiliency: &ResiliencyConfig,
    ) -> Self {
        Self {
            bookings: Arc::new(BookingManager::new(repo, pms)),
            resiliency: Arc::new(ResiliencyState {
                pms_cb: CircuitBreaker::new(
                    "pms",
                    resiliency.failure_threshold,
                    Duration::from_secs(resiliency.reset_timeout_seconds),
                ),
            }),
            fixed_today: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

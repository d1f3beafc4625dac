use arboreal_core::payment::PaymentChoice;
use arboreal_core::pms::{PaymentGateway, PmsClient};
use std::sync::Arc;

use crate::manager::BookingError;
use crate::models::{BookingDraft, PaymentRecord};
use crate::payload::build_reservation;

/// Outcome of an accepted reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub reservation_no: String,
    pub payment: PaymentRecord,
}

pub struct BookingOrchestrator {
    pms: Arc<dyn PmsClient>,
}

impl BookingOrchestrator {
    pub fn new(pms: Arc<dyn PmsClient>) -> Self {
        Self { pms }
    }

    /// Validates the payment choice, assembles the payload and creates the reservation.
    /// Nothing is sent to the PMS when local validation fails.
    pub async fn submit(
        &self,
        draft: &BookingDraft,
        choice: &PaymentChoice,
        gateways: &[PaymentGateway],
    ) -> Result<Submission, BookingError> {
        choice.validate()?;
        let payload = build_reservation(draft, choice, gateways)?;

        tracing::info!(
            draft_id = %draft.id,
            mode = ?choice.mode,
            extras = payload.extra_charge.is_some(),
            "Submitting reservation to PMS"
        );

        let receipt = self.pms.create_booking(&payload).await.map_err(|e| {
            tracing::warn!(draft_id = %draft.id, code = ?e.code(), "Reservation rejected: {}", e);
            e
        })?;

        tracing::info!(draft_id = %draft.id, "Reservation {} created", receipt.reservation_no);

        Ok(Submission {
            reservation_no: receipt.reservation_no,
            payment: PaymentRecord {
                mode: choice.mode,
                gateway_id: payload.gateway_id,
            },
        })
    }
}

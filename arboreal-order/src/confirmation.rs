use arboreal_core::payment::PaymentMode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::BookingDraft;

/// Read-only summary shown once the PMS has issued a reservation number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationSummary {
    pub reservation_no: String,
    pub guest_name: String,
    pub email: String,
    pub phone: String,
    pub room_name: String,
    pub adults: u32,
    pub children: u32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub room_total: Decimal,
    pub extras_charge: Decimal,
    pub total_amount: Decimal,
    pub currency_sign: String,
    pub payment_mode: Option<PaymentMode>,
}

impl ConfirmationSummary {
    /// None unless the draft holds both a reservation number and complete booking details.
    pub fn from_draft(draft: &BookingDraft) -> Option<Self> {
        let reservation_no = draft.reservation_no.clone()?;
        let stay = draft.stay.as_ref()?;
        let guest = draft.guest.as_ref()?;

        Some(Self {
            reservation_no,
            guest_name: guest.full_name(),
            email: guest.email.clone(),
            phone: guest.phone.clone(),
            room_name: draft.room.display_name(),
            adults: draft.search.adults,
            children: draft.search.children,
            check_in: stay.check_in,
            check_out: stay.check_out,
            nights: stay.nights,
            room_total: stay.room_total,
            extras_charge: draft.extras_charge.unwrap_or_default(),
            total_amount: draft.total_amount(),
            currency_sign: draft.room.currency_sign.clone(),
            payment_mode: draft.payment.as_ref().map(|p| p.mode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_requires_reservation_number() {
        let draft = fixtures::draft_at_payment();
        assert!(ConfirmationSummary::from_draft(&draft).is_none());
    }

    #[test]
    fn test_summary_fields() {
        let mut draft = fixtures::draft_at_payment();
        draft.extras_charge = Some(Decimal::from(100));
        draft.reservation_no = Some("R-1001".to_string());

        let summary = ConfirmationSummary::from_draft(&draft).unwrap();
        assert_eq!(summary.reservation_no, "R-1001");
        assert_eq!(summary.guest_name, "Asha Rao");
        assert_eq!(summary.room_name, "Canopy Suite");
        assert_eq!(summary.nights, 3);
        assert_eq!(summary.room_total, Decimal::from(330));
        assert_eq!(summary.total_amount, Decimal::from(430));
        assert_eq!(summary.currency_sign, "₹");
    }

    #[test]
    fn test_missing_details_yields_none() {
        let mut draft = fixtures::draft_at_payment();
        draft.reservation_no = Some("R-1001".to_string());
        draft.stay = None;
        assert!(ConfirmationSummary::from_draft(&draft).is_none());
    }
}

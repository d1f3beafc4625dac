use arboreal_catalog::{RangeSelection, StayQuote};
use arboreal_core::payment::PaymentMode;
use arboreal_core::pms::{ExtraItem, PaymentGateway};
use arboreal_core::room::RoomOffer;
use arboreal_core::search::SearchCriteria;
use arboreal_core::guest::PersonalInfo;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extras::ExtrasSelection;

/// Booking flow stages, in the only order a draft may move through them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    DateSelection,
    PersonalInfo,
    Extras,
    Payment,
    Confirmed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DateSelection => "DATE_SELECTION",
            Stage::PersonalInfo => "PERSONAL_INFO",
            Stage::Extras => "EXTRAS",
            Stage::Payment => "PAYMENT",
            Stage::Confirmed => "CONFIRMED",
        }
    }
}

/// Dates and room total fixed when the guest leaves the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaySummary {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub room_total: Decimal,
}

impl From<StayQuote> for StaySummary {
    fn from(quote: StayQuote) -> Self {
        Self {
            check_in: quote.check_in,
            check_out: quote.check_out,
            nights: quote.nights,
            room_total: quote.room_total,
        }
    }
}

/// What was submitted at the payment stage. Card data is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub mode: PaymentMode,
    pub gateway_id: Option<String>,
}

/// Server-held state of one guest's booking, from room selection to confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub id: Uuid,
    pub room: RoomOffer,
    pub search: SearchCriteria,
    pub stage: Stage,
    pub calendar: RangeSelection,
    pub stay: Option<StaySummary>,
    pub guest: Option<PersonalInfo>,
    #[serde(default)]
    pub extras_catalog: Vec<ExtraItem>,
    #[serde(default)]
    pub extras: ExtrasSelection,
    pub extras_charge: Option<Decimal>,
    #[serde(default)]
    pub gateways: Vec<PaymentGateway>,
    pub payment: Option<PaymentRecord>,
    pub reservation_no: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingDraft {
    pub fn new(room: RoomOffer, search: SearchCriteria) -> Self {
        let now = Utc::now();
        let calendar = RangeSelection::seeded(search.check_in, search.check_out);
        Self {
            id: Uuid::new_v4(),
            room,
            search,
            stage: Stage::DateSelection,
            calendar,
            stay: None,
            guest: None,
            extras_catalog: Vec::new(),
            extras: ExtrasSelection::default(),
            extras_charge: None,
            gateways: Vec::new(),
            payment: None,
            reservation_no: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Room total plus the extras charge fixed at hand-off.
    pub fn total_amount(&self) -> Decimal {
        let room_total = self.stay.as_ref().map(|s| s.room_total).unwrap_or_default();
        room_total + self.extras_charge.unwrap_or_default()
    }

    pub fn extra(&self, extra_id: &str) -> Option<&ExtraItem> {
        self.extras_catalog.iter().find(|e| e.id == extra_id)
    }
}

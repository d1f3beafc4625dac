use arboreal_core::room::RoomOffer;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rate charged for one night of a stay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NightlyRate {
    pub date: NaiveDate,
    pub rate: Decimal,
    /// True when the room had no published rate for this date and the average was used.
    pub fallback: bool,
}

/// Night count and room total for a confirmed date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StayQuote {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub room_total: Decimal,
    pub nightly: Vec<NightlyRate>,
}

/// Prices stays against a room's rate schedule.
pub struct StayPricer<'a> {
    room: &'a RoomOffer,
}

impl<'a> StayPricer<'a> {
    pub fn new(room: &'a RoomOffer) -> Self {
        Self { room }
    }

    /// Rate for a single night. Unpriced dates fall back to the room's average nightly rate.
    pub fn rate_for(&self, date: NaiveDate) -> Decimal {
        self.room
            .rate_on(date)
            .unwrap_or_else(|| self.room.average_nightly_rate())
    }

    /// Whole days between the two dates, never negative.
    pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
        (check_out - check_in).num_days().max(0) as u32
    }

    /// Quote every night in `[check_in, check_out)`.
    pub fn quote(&self, check_in: NaiveDate, check_out: NaiveDate) -> Result<StayQuote, PricingError> {
        if check_out <= check_in {
            return Err(PricingError::InvalidRange { check_in, check_out });
        }

        let nights = Self::nights(check_in, check_out);
        let nightly: Vec<NightlyRate> = (0..nights)
            .map(|i| {
                let date = check_in + Duration::days(i as i64);
                let published = self.room.rate_on(date);
                NightlyRate {
                    date,
                    rate: published.unwrap_or_else(|| self.room.average_nightly_rate()),
                    fallback: published.is_none(),
                }
            })
            .collect();

        let room_total = nightly.iter().map(|n| n.rate).sum();

        Ok(StayQuote {
            check_in,
            check_out,
            nights,
            room_total,
            nightly,
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PricingError {
    #[error("Check-out {check_out} must be after check-in {check_in}")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

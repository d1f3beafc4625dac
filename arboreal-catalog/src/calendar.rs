use arboreal_core::room::RoomOffer;
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::StayPricer;

/// Past dates are never bookable.
pub fn is_selectable(date: NaiveDate, today: NaiveDate) -> bool {
    date >= today
}

/// Result of a single calendar click.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClickOutcome {
    Ignored,
    CheckInSet,
    RangeRestarted,
    RangeCompleted,
}

/// Two-click check-in/check-out selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RangeSelection {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub awaiting_check_out: bool,
}

impl RangeSelection {
    /// Starts from the dates carried over from the search form.
    pub fn seeded(check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) -> Self {
        Self {
            check_in,
            check_out,
            awaiting_check_out: false,
        }
    }

    pub fn click(&mut self, date: NaiveDate, today: NaiveDate) -> ClickOutcome {
        if !is_selectable(date, today) {
            return ClickOutcome::Ignored;
        }

        if !self.awaiting_check_out {
            self.check_in = Some(date);
            self.check_out = None;
            self.awaiting_check_out = true;
            return ClickOutcome::CheckInSet;
        }

        match self.check_in {
            Some(check_in) if date > check_in => {
                self.check_out = Some(date);
                self.awaiting_check_out = false;
                ClickOutcome::RangeCompleted
            }
            _ => {
                self.check_in = Some(date);
                self.check_out = None;
                ClickOutcome::RangeRestarted
            }
        }
    }

    /// Both dates, when the range is complete and ordered.
    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.check_in, self.check_out) {
            (Some(i), Some(o)) if o > i => Some((i, o)),
            _ => None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.range()
            .map(|(i, o)| date >= i && date <= o)
            .unwrap_or(false)
    }
}

/// A calendar month, always anchored on its first day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The previous month, unless that would move before the month containing `today`.
    pub fn previous(&self, today: NaiveDate) -> Self {
        let prev = if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        };
        prev.clamp_to(today)
    }

    /// Months before the current one are not navigable.
    pub fn clamp_to(self, today: NaiveDate) -> Self {
        self.max(Self::containing(today))
    }

    pub fn days_in_month(&self) -> u32 {
        (self.next().first_day() - Duration::days(1)).day()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub selectable: bool,
    /// Only shown for selectable days.
    pub price: Option<Decimal>,
    pub in_range: bool,
    pub is_check_in: bool,
    pub is_check_out: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st, Sunday-first.
    pub leading_blanks: u32,
    pub currency_sign: String,
    pub days: Vec<CalendarDay>,
    pub awaiting_check_out: bool,
    /// None while showing the current month.
    pub previous: Option<CalendarMonth>,
    pub next: CalendarMonth,
}

impl MonthView {
    pub fn render(room: &RoomOffer, selection: &RangeSelection, month: CalendarMonth, today: NaiveDate) -> Self {
        let pricer = StayPricer::new(room);
        let first = month.first_day();

        let days = (0..month.days_in_month())
            .map(|offset| {
                let date = first + Duration::days(offset as i64);
                let selectable = is_selectable(date, today);
                CalendarDay {
                    date,
                    selectable,
                    price: selectable.then(|| pricer.rate_for(date)),
                    in_range: selection.contains(date),
                    is_check_in: selection.check_in == Some(date),
                    is_check_out: selection.check_out == Some(date),
                }
            })
            .collect();

        Self {
            year: month.year,
            month: month.month,
            leading_blanks: first.weekday().num_days_from_sunday(),
            currency_sign: room.currency_sign.clone(),
            days,
            awaiting_check_out: selection.awaiting_check_out,
            previous: Some(month.previous(today)).filter(|prev| *prev != month),
            next: month.next(),
        }
    }
}

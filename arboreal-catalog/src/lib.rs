pub mod pricing;
pub mod calendar;

pub use pricing::{StayPricer, StayQuote, NightlyRate, PricingError};
pub use calendar::{CalendarMonth, CalendarDay, MonthView, RangeSelection, ClickOutcome};

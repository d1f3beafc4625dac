use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::wire::{opt_string_or_number, string_or_number};

/// Room record as returned by the PMS availability lookup. Field names follow the PMS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomOffer {
    #[serde(rename = "roomrateunkid", deserialize_with = "string_or_number")]
    pub rate_plan_id: String,
    #[serde(rename = "ratetypeunkid", deserialize_with = "string_or_number")]
    pub rate_type_id: String,
    #[serde(rename = "roomtypeunkid", deserialize_with = "string_or_number")]
    pub room_type_id: String,
    #[serde(rename = "Room_Name", default)]
    pub room_name: Option<String>,
    #[serde(rename = "Roomtype_Name", default)]
    pub room_type_name: Option<String>,
    #[serde(default)]
    pub currency_sign: String,
    pub room_rates_info: RoomRatesInfo,
    #[serde(default)]
    pub extra_adult_rates_info: Option<RateInfo>,
    #[serde(default)]
    pub extra_child_rates_info: Option<RateInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoomRatesInfo {
    /// Nightly rate keyed by `YYYY-MM-DD`.
    #[serde(default)]
    pub inclusive_tax_adjustment: HashMap<String, Decimal>,
    #[serde(default)]
    pub avg_per_night_after_discount: Option<Decimal>,
    #[serde(default)]
    pub rack_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RateInfo {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub rack_rate: Option<String>,
}

impl RoomOffer {
    /// Rate published for exactly this date, if any.
    pub fn rate_on(&self, date: NaiveDate) -> Option<Decimal> {
        let key = date.format("%Y-%m-%d").to_string();
        self.room_rates_info.inclusive_tax_adjustment.get(&key).copied()
    }

    pub fn average_nightly_rate(&self) -> Decimal {
        self.room_rates_info
            .avg_per_night_after_discount
            .unwrap_or(Decimal::ZERO)
    }

    /// Base rate sent with the reservation: rack rate, then average nightly rate, then zero.
    pub fn base_rate(&self) -> Decimal {
        self.room_rates_info
            .rack_rate
            .or(self.room_rates_info.avg_per_night_after_discount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn extra_adult_rate(&self) -> String {
        Self::rack_or_zero(&self.extra_adult_rates_info)
    }

    pub fn extra_child_rate(&self) -> String {
        Self::rack_or_zero(&self.extra_child_rates_info)
    }

    /// Name shown to the guest; falls back to the room type name.
    pub fn display_name(&self) -> String {
        self.room_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| self.room_type_name.clone())
            .unwrap_or_default()
    }

    fn rack_or_zero(info: &Option<RateInfo>) -> String {
        info.as_ref()
            .and_then(|i| i.rack_rate.clone())
            .unwrap_or_else(|| "0".to_string())
    }
}

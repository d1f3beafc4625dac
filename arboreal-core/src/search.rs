use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Stay parameters collected by the search form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchCriteria {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    #[serde(default = "default_rooms")]
    pub rooms: u32,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn default_rooms() -> u32 { 1 }
fn default_adults() -> u32 { 2 }

pub const MAX_ROOMS: u32 = 10;
pub const MAX_ADULTS: u32 = 20;
pub const MAX_CHILDREN: u32 = 20;

impl SearchCriteria {
    pub fn validate(&self) -> CoreResult<()> {
        let (check_in, check_out) = match (self.check_in, self.check_out) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                return Err(CoreError::ValidationError(
                    "Please select check-in and check-out dates".to_string(),
                ))
            }
        };

        if check_out <= check_in {
            return Err(CoreError::ValidationError(
                "Check-out must be after check-in".to_string(),
            ));
        }
        if self.rooms == 0 {
            return Err(CoreError::ValidationError("At least one room is required".to_string()));
        }
        if self.adults == 0 {
            return Err(CoreError::ValidationError("At least one adult is required".to_string()));
        }
        if self.rooms > MAX_ROOMS || self.adults > MAX_ADULTS || self.children > MAX_CHILDREN {
            return Err(CoreError::ValidationError(format!(
                "At most {} rooms, {} adults and {} children per booking",
                MAX_ROOMS, MAX_ADULTS, MAX_CHILDREN
            )));
        }

        Ok(())
    }

    /// Query string handed to the availability lookup.
    pub fn availability_query(&self) -> String {
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();

        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("checkIn", &date(self.check_in))
            .append_pair("checkOut", &date(self.check_out))
            .append_pair("rooms", &self.rooms.to_string())
            .append_pair("adults", &self.adults.to_string())
            .append_pair("children", &self.children.to_string())
            .append_pair("name", self.name.as_deref().unwrap_or_default())
            .finish()
    }

    /// Returns a copy with the stay dates replaced.
    pub fn with_dates(&self, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            check_in: Some(check_in),
            check_out: Some(check_out),
            ..self.clone()
        }
    }
}

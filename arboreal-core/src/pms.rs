//! Wire types and client trait for the hotel property-management system (PMS).
//!
//! The PMS owns availability, rates, extras pricing and payment processing. The booking
//! flow only lists extras, asks for an extras quote, lists payment gateways and finally
//! creates the reservation.

use arboreal_shared::Masked;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::wire::string_or_number;

pub const PER_QUANTITY_RULE: &str = "PERQUANTITY";

/// Priced add-on offered by the property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtraItem {
    #[serde(rename = "ExtraChargeId", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "charge", default)]
    pub label: String,
    #[serde(rename = "ShortCode", default)]
    pub short_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "ChargeRule", default)]
    pub charge_rule: Option<String>,
    #[serde(rename = "Rate", default)]
    pub rate: Decimal,
}

impl ExtraItem {
    pub fn is_per_quantity(&self) -> bool {
        self.charge_rule.as_deref() == Some(PER_QUANTITY_RULE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalculateExtrasRequest {
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    /// Comma-joined extra ids.
    pub extra_charge_id: String,
    /// Comma-joined quantities, parallel to `extra_charge_id`.
    pub total_extra_item: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtrasChargeQuote {
    #[serde(rename = "totalCharge")]
    pub total_charge: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentGateway {
    #[serde(rename = "paymenttypeunkid", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "paymenttype", default)]
    pub display_name: String,
    #[serde(rename = "shortcode", default)]
    pub short_code: String,
}

/// Reservation-creation payload in the PMS's own field names.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReservationPayload {
    #[serde(rename = "Room_Details")]
    pub room_details: BTreeMap<String, RoomLine>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    #[serde(rename = "Booking_Payment_Mode")]
    pub booking_payment_mode: String,
    #[serde(rename = "Email_Address")]
    pub email_address: Masked<String>,
    #[serde(rename = "Source_Id")]
    pub source_id: String,
    #[serde(rename = "MobileNo")]
    pub mobile_no: Masked<String>,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Zipcode")]
    pub zipcode: String,
    #[serde(rename = "Device")]
    pub device: String,
    #[serde(rename = "Languagekey")]
    pub language_key: String,
    #[serde(rename = "ExtraCharge", skip_serializing_if = "Option::is_none")]
    pub extra_charge: Option<BTreeMap<String, ExtraChargeLine>>,
    #[serde(rename = "CardDetails", skip_serializing_if = "Option::is_none")]
    pub card_details: Option<CardBlock>,
    #[serde(rename = "paymenttypeunkid", skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomLine {
    #[serde(rename = "Rateplan_Id")]
    pub rate_plan_id: String,
    #[serde(rename = "Ratetype_Id")]
    pub rate_type_id: String,
    #[serde(rename = "Roomtype_Id")]
    pub room_type_id: String,
    pub baserate: String,
    pub extradultrate: String,
    pub extrachildrate: String,
    pub number_adults: String,
    pub number_children: String,
    #[serde(rename = "ExtraChild_Age", skip_serializing_if = "Option::is_none")]
    pub extra_child_age: Option<String>,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "First_Name")]
    pub first_name: String,
    #[serde(rename = "Last_Name")]
    pub last_name: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "SpecialRequest")]
    pub special_request: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtraChargeLine {
    #[serde(rename = "ExtraChargeId")]
    pub extra_charge_id: String,
    #[serde(rename = "ChargeAdult")]
    pub charge_adult: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CardBlock {
    pub cc_cardnumber: Masked<String>,
    pub cc_cardtype: String,
    pub cc_expiremonth: String,
    pub cc_expireyear: String,
    pub cvvcode: Masked<String>,
    pub cardholdername: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationReceipt {
    #[serde(rename = "ReservationNo", deserialize_with = "string_or_number")]
    pub reservation_no: String,
}

/// Response envelope shared by every PMS endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(rename = "errorDetails", default)]
    pub error_details: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum PmsError {
    #[error("PMS unreachable: {0}")]
    Transport(String),

    #[error("PMS rejected the request: {message}")]
    Rejected {
        message: String,
        code: Option<String>,
    },

    #[error("Unexpected PMS response: {0}")]
    InvalidResponse(String),

    #[error("PMS client misconfigured: {0}")]
    InvalidConfig(String),
}

impl PmsError {
    /// Builds a rejection from a failure body, preferring the first structured error's
    /// message and code.
    pub fn rejection(message: Option<&str>, error: Option<&Value>, error_details: Option<&Value>) -> Self {
        let first = match error {
            Some(Value::Array(items)) => items.first(),
            _ => None,
        };

        let text = match (first, error) {
            (Some(obj), _) => obj
                .get("Error_Message")
                .or_else(|| obj.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| obj.to_string()),
            (None, Some(Value::Array(_))) | (None, None) => message
                .map(str::to_string)
                .unwrap_or_else(|| "Booking failed. Please try again.".to_string()),
            (None, Some(other)) => message
                .map(str::to_string)
                .or_else(|| other.as_str().map(str::to_string))
                .unwrap_or_else(|| other.to_string()),
        };

        let code = error_details
            .and_then(|d| d.get("Error_Code"))
            .or_else(|| first.and_then(|f| f.get("Error_Code")))
            .map(|c| match c {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });

        PmsError::Rejected { message: text, code }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            PmsError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl<T> Envelope<T> {
    /// Unwraps `data` from a successful envelope or turns the body into a `PmsError`.
    pub fn into_result(self) -> Result<T, PmsError> {
        if !self.success {
            return Err(PmsError::rejection(
                self.message.as_deref(),
                self.error.as_ref(),
                self.error_details.as_ref(),
            ));
        }
        self.data
            .ok_or_else(|| PmsError::InvalidResponse("missing data in successful response".to_string()))
    }
}

#[async_trait]
pub trait PmsClient: Send + Sync {
    async fn list_extras(&self) -> Result<Vec<ExtraItem>, PmsError>;

    async fn calculate_extras(
        &self,
        request: &CalculateExtrasRequest,
    ) -> Result<ExtrasChargeQuote, PmsError>;

    async fn list_payment_gateways(&self) -> Result<Vec<PaymentGateway>, PmsError>;

    async fn create_booking(
        &self,
        payload: &ReservationPayload,
    ) -> Result<ReservationReceipt, PmsError>;
}

/// Test double for the PMS. Extras are quoted as rate × quantity.
#[derive(Default)]
pub struct MockPmsClient {
    pub extras: Vec<ExtraItem>,
    pub gateways: Vec<PaymentGateway>,
    pub reservation_no: String,
    /// When set, `create_booking` fails with this message and code.
    pub reject_with: Option<(String, Option<String>)>,
    submitted: Mutex<Vec<ReservationPayload>>,
    quote_requests: Mutex<Vec<CalculateExtrasRequest>>,
}

impl MockPmsClient {
    pub fn new(extras: Vec<ExtraItem>, gateways: Vec<PaymentGateway>, reservation_no: &str) -> Self {
        Self {
            extras,
            gateways,
            reservation_no: reservation_no.to_string(),
            ..Default::default()
        }
    }

    pub fn submitted(&self) -> Vec<ReservationPayload> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn quote_requests(&self) -> Vec<CalculateExtrasRequest> {
        self.quote_requests.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PmsClient for MockPmsClient {
    async fn list_extras(&self) -> Result<Vec<ExtraItem>, PmsError> {
        Ok(self.extras.clone())
    }

    async fn calculate_extras(
        &self,
        request: &CalculateExtrasRequest,
    ) -> Result<ExtrasChargeQuote, PmsError> {
        if let Ok(mut log) = self.quote_requests.lock() {
            log.push(request.clone());
        }

        let ids = request.extra_charge_id.split(',').filter(|s| !s.is_empty());
        let quantities = request.total_extra_item.split(',').filter(|s| !s.is_empty());

        let mut total = Decimal::ZERO;
        for (id, quantity) in ids.zip(quantities) {
            let extra = self
                .extras
                .iter()
                .find(|e| e.id == id)
                .ok_or_else(|| PmsError::rejection(Some("Unknown extra charge"), None, None))?;
            let quantity: u32 = quantity
                .parse()
                .map_err(|_| PmsError::InvalidResponse(format!("bad quantity {}", quantity)))?;
            total += extra.rate * Decimal::from(quantity);
        }

        Ok(ExtrasChargeQuote { total_charge: total })
    }

    async fn list_payment_gateways(&self) -> Result<Vec<PaymentGateway>, PmsError> {
        Ok(self.gateways.clone())
    }

    async fn create_booking(
        &self,
        payload: &ReservationPayload,
    ) -> Result<ReservationReceipt, PmsError> {
        if let Ok(mut log) = self.submitted.lock() {
            log.push(payload.clone());
        }

        if let Some((message, code)) = &self.reject_with {
            return Err(PmsError::Rejected {
                message: message.clone(),
                code: code.clone(),
            });
        }

        tracing::info!("Mock PMS accepted reservation {}", self.reservation_no);
        Ok(ReservationReceipt {
            reservation_no: self.reservation_no.clone(),
        })
    }
}

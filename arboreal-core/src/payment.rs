use arboreal_shared::Masked;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    #[default]
    PayAtProperty,
    Card,
}

/// Card details as typed by the guest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CardDetails {
    #[serde(default)]
    pub card_number: Masked<String>,
    #[serde(default)]
    pub card_holder_name: String,
    #[serde(default = "default_card_type")]
    pub card_type: String,
    #[serde(default)]
    pub expiry_month: String,
    #[serde(default)]
    pub expiry_year: String,
    #[serde(default)]
    pub cvv: Masked<String>,
}

fn default_card_type() -> String {
    "Visa".to_string()
}

impl CardDetails {
    /// All six card fields must be non-empty.
    pub fn validate(&self) -> CoreResult<()> {
        let missing = self.card_number.is_blank()
            || self.card_holder_name.trim().is_empty()
            || self.card_type.trim().is_empty()
            || self.expiry_month.trim().is_empty()
            || self.expiry_year.trim().is_empty()
            || self.cvv.is_blank();

        if missing {
            return Err(CoreError::ValidationError(
                "Please fill in all card details (number, name, type, expiry, CVV)".to_string(),
            ));
        }
        Ok(())
    }

    /// Card network code expected by the PMS.
    pub fn network_code(&self) -> String {
        match self.card_type.trim() {
            "Visa" => "VISA".to_string(),
            "MasterCard" => "MASTERCARD".to_string(),
            "American Express" => "AMEX".to_string(),
            "Discover" => "DISCOVER".to_string(),
            other => other.to_uppercase(),
        }
    }

    pub fn padded_expiry_month(&self) -> String {
        format!("{:0>2}", self.expiry_month.trim())
    }
}

/// Payment choice submitted at the payment stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PaymentChoice {
    #[serde(default)]
    pub mode: PaymentMode,
    #[serde(default)]
    pub card: Option<CardDetails>,
    #[serde(default)]
    pub gateway_id: Option<String>,
}

impl PaymentChoice {
    /// Card mode requires complete card details; pay at property needs nothing.
    pub fn validate(&self) -> CoreResult<&Self> {
        if self.mode == PaymentMode::Card {
            match &self.card {
                Some(card) => card.validate()?,
                None => {
                    return Err(CoreError::ValidationError(
                        "Please fill in all card details (number, name, type, expiry, CVV)".to_string(),
                    ))
                }
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CardDetails {
        CardDetails {
            card_number: " 4111111111111111 ".into(),
            card_holder_name: "Asha Rao ".to_string(),
            card_type: "American Express".to_string(),
            expiry_month: "7".to_string(),
            expiry_year: "2030".to_string(),
            cvv: "123".into(),
        }
    }

    #[test]
    fn test_complete_card_passes() {
        assert!(card().validate().is_ok());
    }

    #[test]
    fn test_each_missing_field_fails() {
        for field in 0..6 {
            let mut c = card();
            match field {
                0 => c.card_number = "".into(),
                1 => c.card_holder_name.clear(),
                2 => c.card_type.clear(),
                3 => c.expiry_month.clear(),
                4 => c.expiry_year.clear(),
                _ => c.cvv = "".into(),
            }
            assert!(c.validate().is_err());
        }
    }

    #[test]
    fn test_network_code_and_expiry() {
        let mut c = card();
        assert_eq!(c.network_code(), "AMEX");
        assert_eq!(c.padded_expiry_month(), "07");
        c.card_type = "rupay".to_string();
        assert_eq!(c.network_code(), "RUPAY");
    }

    #[test]
    fn test_card_mode_without_card_fails() {
        let choice = PaymentChoice { mode: PaymentMode::Card, card: None, gateway_id: None };
        assert!(choice.validate().is_err());

        let at_property = PaymentChoice::default();
        assert!(at_property.validate().is_ok());
    }

    #[test]
    fn test_payment_mode_wire_names() {
        let mode: PaymentMode = serde_json::from_str("\"PAY_AT_PROPERTY\"").unwrap();
        assert_eq!(mode, PaymentMode::PayAtProperty);
        assert_eq!(serde_json::to_string(&PaymentMode::Card).unwrap(), "\"CARD\"");
    }
}

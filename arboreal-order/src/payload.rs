use arboreal_core::payment::{PaymentChoice, PaymentMode};
use arboreal_core::pms::{CardBlock, PaymentGateway, ReservationPayload, RoomLine};
use arboreal_shared::Masked;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::manager::BookingError;
use crate::models::BookingDraft;

/// Age reported to the PMS for every child on the booking.
const DEFAULT_CHILD_AGE: &str = "5";

/// Builds the PMS reservation payload from a draft that has reached payment.
pub fn build_reservation(
    draft: &BookingDraft,
    choice: &PaymentChoice,
    gateways: &[PaymentGateway],
) -> Result<ReservationPayload, BookingError> {
    let stay = draft
        .stay
        .as_ref()
        .ok_or(BookingError::MissingPrerequisite("stay dates"))?;
    let guest = draft
        .guest
        .as_ref()
        .ok_or(BookingError::MissingPrerequisite("guest details"))?;

    let room = &draft.room;
    let children = draft.search.children;

    let room_line = RoomLine {
        rate_plan_id: room.rate_plan_id.clone(),
        rate_type_id: room.rate_type_id.clone(),
        room_type_id: room.room_type_id.clone(),
        baserate: room.base_rate().to_string(),
        extradultrate: room.extra_adult_rate(),
        extrachildrate: room.extra_child_rate(),
        number_adults: draft.search.adults.to_string(),
        number_children: children.to_string(),
        extra_child_age: (children > 0).then(|| {
            vec![DEFAULT_CHILD_AGE; children as usize].join(",")
        }),
        title: guest.title.clone(),
        first_name: guest.first_name.clone(),
        last_name: guest.last_name.clone(),
        gender: guest.gender.clone(),
        special_request: guest.special_request.clone(),
    };

    let mut room_details = BTreeMap::new();
    room_details.insert("Room_1".to_string(), room_line);

    let extras_charge = draft.extras_charge.unwrap_or_default();
    let extra_charge = (extras_charge > Decimal::ZERO && !draft.extras.is_empty())
        .then(|| draft.extras.package());

    let (card_details, gateway_id) = match (choice.mode, &choice.card) {
        (PaymentMode::Card, Some(card)) => {
            let block = CardBlock {
                cc_cardnumber: Masked(card.card_number.expose().trim().to_string()),
                cc_cardtype: card.network_code(),
                cc_expiremonth: card.padded_expiry_month(),
                cc_expireyear: card.expiry_year.trim().to_string(),
                cvvcode: card.cvv.clone(),
                cardholdername: card.card_holder_name.trim().to_string(),
            };
            let gateway = choice
                .gateway_id
                .clone()
                .or_else(|| gateways.first().map(|g| g.id.clone()));
            (Some(block), gateway)
        }
        _ => (None, None),
    };

    Ok(ReservationPayload {
        room_details,
        check_in_date: stay.check_in,
        check_out_date: stay.check_out,
        booking_payment_mode: String::new(),
        email_address: Masked(guest.email.clone()),
        source_id: String::new(),
        mobile_no: Masked(guest.phone.clone()),
        address: guest.address.clone(),
        state: guest.state.clone(),
        country: guest.country.clone(),
        city: guest.city.clone(),
        zipcode: guest.zipcode.clone(),
        device: "WEB".to_string(),
        language_key: "en".to_string(),
        extra_charge,
        card_details,
        gateway_id,
    })
}

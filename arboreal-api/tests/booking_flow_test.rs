use std::sync::Arc;
use std::time::Duration;

use arboreal_api::{app, AppState};
use arboreal_core::pms::{
    CalculateExtrasRequest, ExtraItem, ExtrasChargeQuote, MockPmsClient, PaymentGateway, PmsClient,
    PmsError, ReservationPayload, ReservationReceipt,
};
use arboreal_store::app_config::ResiliencyConfig;
use arboreal_store::InMemoryDraftStore;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

fn extras() -> Vec<ExtraItem> {
    serde_json::from_value(json!([
        { "ExtraChargeId": "spa", "charge": "Spa session", "ShortCode": "SPA", "ChargeRule": "PERQUANTITY", "Rate": 50 },
        { "ExtraChargeId": "dinner", "charge": "Candlelight dinner", "ShortCode": "DIN", "ChargeRule": "PERBOOKING", "Rate": 40 }
    ]))
    .unwrap()
}

fn gateways() -> Vec<PaymentGateway> {
    serde_json::from_value(json!([
        { "paymenttypeunkid": 4, "paymenttype": "Credit Card", "shortcode": "CC" }
    ]))
    .unwrap()
}

fn mock_pms() -> MockPmsClient {
    MockPmsClient::new(extras(), gateways(), "10045")
}

/// Extras quotes never come back.
struct StalledQuotes(MockPmsClient);

#[async_trait]
impl PmsClient for StalledQuotes {
    async fn list_extras(&self) -> Result<Vec<ExtraItem>, PmsError> {
        self.0.list_extras().await
    }

    async fn calculate_extras(&self, _request: &CalculateExtrasRequest) -> Result<ExtrasChargeQuote, PmsError> {
        std::future::pending().await
    }

    async fn list_payment_gateways(&self) -> Result<Vec<PaymentGateway>, PmsError> {
        self.0.list_payment_gateways().await
    }

    async fn create_booking(&self, payload: &ReservationPayload) -> Result<ReservationReceipt, PmsError> {
        self.0.create_booking(payload).await
    }
}

/// The PMS is down by the time the reservation is sent.
struct UnreachableBookings(MockPmsClient);

#[async_trait]
impl PmsClient for UnreachableBookings {
    async fn list_extras(&self) -> Result<Vec<ExtraItem>, PmsError> {
        self.0.list_extras().await
    }

    async fn calculate_extras(&self, request: &CalculateExtrasRequest) -> Result<ExtrasChargeQuote, PmsError> {
        self.0.calculate_extras(request).await
    }

    async fn list_payment_gateways(&self) -> Result<Vec<PaymentGateway>, PmsError> {
        self.0.list_payment_gateways().await
    }

    async fn create_booking(&self, _payload: &ReservationPayload) -> Result<ReservationReceipt, PmsError> {
        Err(PmsError::Transport("connection refused".to_string()))
    }
}

fn router(pms: Arc<MockPmsClient>, resiliency: ResiliencyConfig) -> Router {
    let mut state = AppState::new(Arc::new(InMemoryDraftStore::default()), pms, &resiliency);
    state.fixed_today = NaiveDate::from_ymd_opt(2025, 3, 1);
    app(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Option<String>, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, location, json)
}

fn start_request() -> Value {
    json!({
        "room": {
            "roomrateunkid": 11,
            "ratetypeunkid": 22,
            "roomtypeunkid": 33,
            "Room_Name": "Canopy Suite",
            "Roomtype_Name": "Suite",
            "currency_sign": "₹",
            "room_rates_info": {
                "inclusive_tax_adjustment": { "2025-03-10": 100, "2025-03-11": 120, "2025-03-12": 110 },
                "avg_per_night_after_discount": 110
            }
        },
        "search": {
            "check_in": "2025-03-10",
            "check_out": "2025-03-13",
            "rooms": 1,
            "adults": 2,
            "children": 0,
            "name": "Asha Rao"
        }
    })
}

fn guest() -> Value {
    json!({
        "title": "Ms",
        "first_name": "Asha",
        "last_name": "Rao",
        "email": "asha@example.com",
        "phone": "+919800000000",
        "country": "India"
    })
}

async fn start(app: &Router) -> String {
    let (status, _, body) = send(app, Method::POST, "/v1/bookings", Some(start_request())).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn to_extras(app: &Router) -> String {
    let id = start(app).await;
    let (status, _, _) = send(app, Method::POST, &format!("/v1/bookings/{}/dates", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(app, Method::PUT, &format!("/v1/bookings/{}/guest", id), Some(guest())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(app, Method::GET, &format!("/v1/bookings/{}/extras", id), None).await;
    assert_eq!(status, StatusCode::OK);
    id
}

async fn wait_for_extras(app: &Router, id: &str) -> Value {
    for _ in 0..100 {
        let (_, _, body) = send(app, Method::GET, &format!("/v1/bookings/{}", id), None).await;
        if body["extras"]["calculating"] == false {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("extras recalculation never settled");
}

#[tokio::test]
async fn test_search_hands_off_to_availability() {
    let app = router(Arc::new(mock_pms()), ResiliencyConfig::default());

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/v1/search",
        Some(json!({ "check_in": "2025-03-10", "check_out": "2025-03-13", "name": "Asha Rao" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["availability_url"],
        "/availability?checkIn=2025-03-10&checkOut=2025-03-13&rooms=1&adults=2&children=0&name=Asha+Rao"
    );

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/v1/search",
        Some(json!({ "check_in": "2025-03-13", "check_out": "2025-03-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Check-out"));
}

#[tokio::test]
async fn test_full_booking_flow() {
    let pms = Arc::new(mock_pms());
    let app = router(pms.clone(), ResiliencyConfig::default());
    let id = start(&app).await;

    // Calendar
    let (status, _, month) =
        send(&app, Method::GET, &format!("/v1/bookings/{}/calendar?year=2025&month=3", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(month["leading_blanks"], 6);
    assert_eq!(month["days"][9]["price"], "100");
    assert_eq!(month["days"][9]["is_check_in"], true);
    assert_eq!(month["previous"], Value::Null);
    assert_eq!(month["next"], json!({ "year": 2025, "month": 4 }));

    let select = format!("/v1/bookings/{}/calendar/select", id);
    let (_, _, sel) = send(&app, Method::POST, &select, Some(json!({ "date": "2025-03-10" }))).await;
    assert_eq!(sel["outcome"], "CHECK_IN_SET");
    let (_, _, sel) = send(&app, Method::POST, &select, Some(json!({ "date": "2025-03-13" }))).await;
    assert_eq!(sel["outcome"], "RANGE_COMPLETED");
    assert_eq!(sel["check_out"], "2025-03-13");

    let (status, _, draft) = send(&app, Method::POST, &format!("/v1/bookings/{}/dates", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["stay"]["nights"], 3);
    assert_eq!(draft["stay"]["room_total"], "330");
    assert_eq!(draft["stage"], "PERSONAL_INFO");

    // Guest
    let (status, _, draft) = send(&app, Method::PUT, &format!("/v1/bookings/{}/guest", id), Some(guest())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["stage"], "EXTRAS");

    // Extras
    let (_, _, extras) = send(&app, Method::GET, &format!("/v1/bookings/{}/extras", id), None).await;
    assert_eq!(extras["catalog"].as_array().unwrap().len(), 2);

    let (status, _, _) =
        send(&app, Method::POST, &format!("/v1/bookings/{}/extras/spa/toggle", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(
        &app,
        Method::PUT,
        &format!("/v1/bookings/{}/extras/spa/quantity", id),
        Some(json!({ "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let draft = wait_for_extras(&app, &id).await;
    assert_eq!(draft["extras"]["charge"], "100");

    let (status, _, draft) =
        send(&app, Method::POST, &format!("/v1/bookings/{}/extras/continue", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["total_amount"], "430");

    // Payment
    let (status, _, gateways) =
        send(&app, Method::GET, &format!("/v1/bookings/{}/payment-gateways", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gateways[0]["paymenttypeunkid"], "4");

    let (status, _, paid) = send(
        &app,
        Method::POST,
        &format!("/v1/bookings/{}/payment", id),
        Some(json!({ "mode": "PAY_AT_PROPERTY" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["reservation_no"], "10045");

    let payload = serde_json::to_value(&pms.submitted()[0]).unwrap();
    assert!(payload.get("CardDetails").is_none());
    assert!(payload.get("paymenttypeunkid").is_none());
    assert_eq!(
        payload["ExtraCharge"],
        json!({ "Extra_1": { "ExtraChargeId": "spa", "ChargeAdult": "2" } })
    );

    // Confirmation, served once
    let confirmation = format!("/v1/bookings/{}/confirmation", id);
    let (status, _, summary) = send(&app, Method::GET, &confirmation, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["reservation_no"], "10045");
    assert_eq!(summary["guest_name"], "Asha Rao");
    assert_eq!(summary["room_name"], "Canopy Suite");
    assert_eq!(summary["total_amount"], "430");

    let (status, location, _) = send(&app, Method::GET, &confirmation, None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/"));
}

#[tokio::test]
async fn test_previous_month_is_clamped() {
    let app = router(Arc::new(mock_pms()), ResiliencyConfig::default());
    let id = start(&app).await;

    let (status, _, month) =
        send(&app, Method::GET, &format!("/v1/bookings/{}/calendar?year=2024&month=12", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(month["year"], 2025);
    assert_eq!(month["month"], 3);

    let (status, _, _) =
        send(&app, Method::GET, &format!("/v1/bookings/{}/calendar?year=2025&month=13", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_skipping_a_stage_redirects_and_discards() {
    let app = router(Arc::new(mock_pms()), ResiliencyConfig::default());
    let id = start(&app).await;

    let (status, location, _) = send(&app, Method::GET, &format!("/v1/bookings/{}/extras", id), None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/availability"));

    let (status, _, _) = send(&app, Method::GET, &format!("/v1/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_confirmation_without_reservation_redirects_home() {
    let app = router(Arc::new(mock_pms()), ResiliencyConfig::default());
    let id = start(&app).await;

    let (status, location, body) =
        send(&app, Method::GET, &format!("/v1/bookings/{}/confirmation", id), None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/"));
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_continue_rejected_while_calculating() {
    let pms = Arc::new(StalledQuotes(mock_pms()));
    let mut state = AppState::new(
        Arc::new(InMemoryDraftStore::default()),
        pms,
        &ResiliencyConfig::default(),
    );
    state.fixed_today = NaiveDate::from_ymd_opt(2025, 3, 1);
    let app = app(state);
    let id = to_extras(&app).await;

    let toggle = format!("/v1/bookings/{}/extras/spa/toggle", id);
    let (status, _, extras) = send(&app, Method::POST, &toggle, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extras["calculating"], true);

    let continue_uri = format!("/v1/bookings/{}/extras/continue", id);
    let (status, _, _) = send(&app, Method::POST, &continue_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Deselecting the only extra settles the total without a quote
    let (_, _, extras) = send(&app, Method::POST, &toggle, None).await;
    assert_eq!(extras["calculating"], false);
    assert_eq!(extras["charge"], "0");

    let (status, _, draft) = send(&app, Method::POST, &continue_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["stage"], "PAYMENT");
    assert_eq!(draft["extras_charge"], "0");
}

#[tokio::test]
async fn test_incomplete_card_never_reaches_pms() {
    let pms = Arc::new(mock_pms());
    let app = router(pms.clone(), ResiliencyConfig::default());
    let id = to_extras(&app).await;
    send(&app, Method::POST, &format!("/v1/bookings/{}/extras/skip", id), None).await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        &format!("/v1/bookings/{}/payment", id),
        Some(json!({
            "mode": "CARD",
            "card": {
                "card_number": "4111111111111111",
                "card_holder_name": "Asha Rao",
                "card_type": "Visa",
                "expiry_month": "12",
                "expiry_year": "",
                "cvv": "123"
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("card details"));
    assert!(pms.submitted().is_empty());
}

#[tokio::test]
async fn test_card_payment_defaults_gateway() {
    let pms = Arc::new(mock_pms());
    let app = router(pms.clone(), ResiliencyConfig::default());
    let id = to_extras(&app).await;
    send(&app, Method::POST, &format!("/v1/bookings/{}/extras/skip", id), None).await;

    let (status, _, _) = send(
        &app,
        Method::POST,
        &format!("/v1/bookings/{}/payment", id),
        Some(json!({
            "mode": "CARD",
            "card": {
                "card_number": " 4111111111111111 ",
                "card_holder_name": "Asha Rao",
                "card_type": "American Express",
                "expiry_month": "7",
                "expiry_year": "2030",
                "cvv": "1234"
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let payload = serde_json::to_value(&pms.submitted()[0]).unwrap();
    assert_eq!(payload["paymenttypeunkid"], "4");
    assert_eq!(payload["CardDetails"]["cc_cardtype"], "AMEX");
    assert_eq!(payload["CardDetails"]["cc_expiremonth"], "07");
    assert_eq!(payload["CardDetails"]["cc_cardnumber"], "4111111111111111");
    assert!(payload.get("ExtraCharge").is_none());
}

#[tokio::test]
async fn test_pms_rejection_leaves_circuit_closed() {
    let mut pms = mock_pms();
    pms.reject_with = Some(("Room no longer available".to_string(), Some("RNA".to_string())));
    let resiliency = ResiliencyConfig {
        failure_threshold: 1,
        reset_timeout_seconds: 60,
    };
    let app = router(Arc::new(pms), resiliency);
    let id = to_extras(&app).await;
    send(&app, Method::POST, &format!("/v1/bookings/{}/extras/skip", id), None).await;

    let payment = format!("/v1/bookings/{}/payment", id);
    for _ in 0..3 {
        let (status, _, body) = send(&app, Method::POST, &payment, Some(json!({ "mode": "PAY_AT_PROPERTY" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Room no longer available");
        assert_eq!(body["code"], "RNA");
    }

    // Other guests still reach the PMS
    let other = to_extras(&app).await;
    send(&app, Method::POST, &format!("/v1/bookings/{}/extras/skip", other), None).await;
    let (status, _, _) = send(&app, Method::GET, &format!("/v1/bookings/{}/payment-gateways", other), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, draft) = send(&app, Method::GET, &format!("/v1/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["stage"], "PAYMENT");
}

#[tokio::test]
async fn test_unreachable_pms_opens_circuit() {
    let resiliency = ResiliencyConfig {
        failure_threshold: 1,
        reset_timeout_seconds: 60,
    };
    let mut state = AppState::new(
        Arc::new(InMemoryDraftStore::default()),
        Arc::new(UnreachableBookings(mock_pms())),
        &resiliency,
    );
    state.fixed_today = NaiveDate::from_ymd_opt(2025, 3, 1);
    let app = app(state);
    let id = to_extras(&app).await;
    send(&app, Method::POST, &format!("/v1/bookings/{}/extras/skip", id), None).await;

    let payment = format!("/v1/bookings/{}/payment", id);
    let (status, _, body) = send(&app, Method::POST, &payment, Some(json!({ "mode": "PAY_AT_PROPERTY" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "The booking service is unreachable. Please try again.");

    let (status, _, _) = send(&app, Method::POST, &payment, Some(json!({ "mode": "PAY_AT_PROPERTY" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Draft is still at payment and can be inspected
    let (status, _, draft) = send(&app, Method::GET, &format!("/v1/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["stage"], "PAYMENT");
}

#[tokio::test]
async fn test_past_search_dates_cannot_proceed() {
    let app = router(Arc::new(mock_pms()), ResiliencyConfig::default());
    let mut request = start_request();
    request["search"]["check_in"] = json!("2025-02-20");
    request["search"]["check_out"] = json!("2025-02-22");
    let (status, _, body) = send(&app, Method::POST, "/v1/bookings", Some(request)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(&app, Method::POST, &format!("/v1/bookings/{}/dates", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("past"));

    let (status, _, draft) = send(&app, Method::GET, &format!("/v1/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["stage"], "DATE_SELECTION");
}

#[tokio::test]
async fn test_oversized_party_rejected() {
    let app = router(Arc::new(mock_pms()), ResiliencyConfig::default());
    let mut request = start_request();
    request["search"]["children"] = json!(u32::MAX);
    let (status, _, body) = send(&app, Method::POST, "/v1/bookings", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("children"));
}

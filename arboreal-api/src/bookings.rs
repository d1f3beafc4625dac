use arboreal_catalog::{CalendarMonth, ClickOutcome, MonthView};
use arboreal_core::guest::PersonalInfo;
use arboreal_core::payment::PaymentChoice;
use arboreal_core::pms::{ExtraItem, PaymentGateway};
use arboreal_core::room::RoomOffer;
use arboreal_core::search::SearchCriteria;
use arboreal_order::{
    BookingDraft, BookingError, ConfirmationSummary, SelectedExtra, Stage, StaySummary,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartBookingRequest {
    pub room: RoomOffer,
    pub search: SearchCriteria,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SelectDateRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub outcome: ClickOutcome,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub awaiting_check_out: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct ExtrasView {
    pub catalog: Vec<ExtraItem>,
    pub selected: Vec<SelectedExtra>,
    pub charge: Decimal,
    pub calculating: bool,
    pub currency_sign: String,
}

impl From<&BookingDraft> for ExtrasView {
    fn from(draft: &BookingDraft) -> Self {
        Self {
            catalog: draft.extras_catalog.clone(),
            selected: draft.extras.selected.clone(),
            charge: draft.extras.charge,
            calculating: draft.extras.is_calculating(),
            currency_sign: draft.room.currency_sign.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GuestView {
    pub name: String,
    pub email: arboreal_shared::Masked<String>,
}

#[derive(Debug, Serialize)]
pub struct DraftView {
    pub id: Uuid,
    pub stage: Stage,
    pub room_name: String,
    pub currency_sign: String,
    pub search: SearchCriteria,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub awaiting_check_out: bool,
    pub stay: Option<StaySummary>,
    pub guest: Option<GuestView>,
    pub extras: ExtrasView,
    pub extras_charge: Option<Decimal>,
    pub total_amount: Decimal,
    pub reservation_no: Option<String>,
}

impl From<&BookingDraft> for DraftView {
    fn from(draft: &BookingDraft) -> Self {
        Self {
            id: draft.id,
            stage: draft.stage,
            room_name: draft.room.display_name(),
            currency_sign: draft.room.currency_sign.clone(),
            search: draft.search.clone(),
            check_in: draft.calendar.check_in,
            check_out: draft.calendar.check_out,
            awaiting_check_out: draft.calendar.awaiting_check_out,
            stay: draft.stay.clone(),
            guest: draft.guest.as_ref().map(|g| GuestView {
                name: g.full_name(),
                email: arboreal_shared::Masked(g.email.clone()),
            }),
            extras: ExtrasView::from(draft),
            extras_charge: draft.extras_charge,
            total_amount: draft.total_amount(),
            reservation_no: draft.reservation_no.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub reservation_no: String,
    pub confirmation_url: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(start_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/calendar", get(get_calendar))
        .route("/v1/bookings/{id}/calendar/select", post(select_date))
        .route("/v1/bookings/{id}/dates", post(confirm_dates))
        .route("/v1/bookings/{id}/guest", put(record_guest))
        .route("/v1/bookings/{id}/extras", get(get_extras))
        .route("/v1/bookings/{id}/extras/skip", post(skip_extras))
        .route("/v1/bookings/{id}/extras/continue", post(continue_extras))
        .route("/v1/bookings/{id}/extras/{extra_id}/toggle", post(toggle_extra))
        .route("/v1/bookings/{id}/extras/{extra_id}/quantity", put(set_extra_quantity))
        .route("/v1/bookings/{id}/payment-gateways", get(get_payment_gateways))
        .route("/v1/bookings/{id}/payment", post(submit_payment))
        .route("/v1/bookings/{id}/confirmation", get(get_confirmation))
}

/// Navigation-state errors discard the draft before redirecting to the availability entry.
async fn settle<T>(state: &AppState, id: Uuid, result: Result<T, BookingError>) -> Result<T, AppError> {
    match result {
        Err(BookingError::MissingPrerequisite(missing)) => {
            tracing::info!(draft_id = %id, "Draft missing {}, restarting from availability", missing);
            if let Err(e) = state.bookings.discard(id).await {
                tracing::error!(draft_id = %id, "Failed to discard draft: {}", e);
            }
            Err(BookingError::MissingPrerequisite(missing).into())
        }
        other => other.map_err(AppError::from),
    }
}

// ============================================================================
// Date Selection
// ============================================================================

/// POST /v1/bookings
/// Start a draft for the room chosen from the availability results
async fn start_booking(
    State(state): State<AppState>,
    Json(req): Json<StartBookingRequest>,
) -> Result<(StatusCode, Json<DraftView>), AppError> {
    let draft = state.bookings.start(req.room, req.search).await?;
    Ok((StatusCode::CREATED, Json(DraftView::from(&draft))))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let draft = state.bookings.get(id).await?;
    Ok(Json(DraftView::from(&draft)))
}

/// GET /v1/bookings/{id}/calendar?year=&month=
/// Month grid with nightly prices; months before the current one are clamped
async fn get_calendar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthView>, AppError> {
    let month = match (query.year, query.month) {
        (Some(year), Some(month)) => Some(
            CalendarMonth::new(year, month)
                .ok_or_else(|| AppError::ValidationError(format!("Invalid month {}-{}", year, month)))?,
        ),
        (None, None) => None,
        _ => {
            return Err(AppError::ValidationError(
                "year and month must be given together".to_string(),
            ))
        }
    };

    let result = state.bookings.calendar(id, month, state.today()).await;
    Ok(Json(settle(&state, id, result).await?))
}

/// POST /v1/bookings/{id}/calendar/select
async fn select_date(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectDateRequest>,
) -> Result<Json<SelectionResponse>, AppError> {
    let result = state.bookings.select_date(id, req.date, state.today()).await;
    let (outcome, selection) = settle(&state, id, result).await?;

    Ok(Json(SelectionResponse {
        outcome,
        check_in: selection.check_in,
        check_out: selection.check_out,
        awaiting_check_out: selection.awaiting_check_out,
    }))
}

/// POST /v1/bookings/{id}/dates
/// Fix the selected range and continue to personal info
async fn confirm_dates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let result = state.bookings.confirm_dates(id, state.today()).await;
    let draft = settle(&state, id, result).await?;
    Ok(Json(DraftView::from(&draft)))
}

// ============================================================================
// Personal Info
// ============================================================================

/// PUT /v1/bookings/{id}/guest
async fn record_guest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(info): Json<PersonalInfo>,
) -> Result<Json<DraftView>, AppError> {
    let result = state.bookings.record_guest(id, info).await;
    let draft = settle(&state, id, result).await?;
    Ok(Json(DraftView::from(&draft)))
}

// ============================================================================
// Extras
// ============================================================================

/// GET /v1/bookings/{id}/extras
/// Enter the extras stage; the catalog is fetched from the PMS on first entry
async fn get_extras(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExtrasView>, AppError> {
    let result = state.bookings.open_extras(id).await;
    let draft = settle(&state, id, result).await?;
    Ok(Json(ExtrasView::from(&draft)))
}

/// POST /v1/bookings/{id}/extras/{extra_id}/toggle
/// Returns immediately; the new total arrives once the PMS quote is applied
async fn toggle_extra(
    State(state): State<AppState>,
    Path((id, extra_id)): Path<(Uuid, String)>,
) -> Result<Json<ExtrasView>, AppError> {
    let result = state.bookings.toggle_extra(id, &extra_id).await;
    let draft = settle(&state, id, result).await?;
    Ok(Json(ExtrasView::from(&draft)))
}

/// PUT /v1/bookings/{id}/extras/{extra_id}/quantity
async fn set_extra_quantity(
    State(state): State<AppState>,
    Path((id, extra_id)): Path<(Uuid, String)>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<ExtrasView>, AppError> {
    // Anything below one is ignored downstream
    let quantity = u32::try_from(req.quantity).unwrap_or(0);
    let result = state.bookings.set_extra_quantity(id, &extra_id, quantity).await;
    let draft = settle(&state, id, result).await?;
    Ok(Json(ExtrasView::from(&draft)))
}

/// POST /v1/bookings/{id}/extras/skip
async fn skip_extras(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let result = state.bookings.skip_extras(id).await;
    let draft = settle(&state, id, result).await?;
    Ok(Json(DraftView::from(&draft)))
}

/// POST /v1/bookings/{id}/extras/continue
/// 409 while a recalculation is outstanding
async fn continue_extras(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, AppError> {
    let result = state.bookings.continue_extras(id).await;
    let draft = settle(&state, id, result).await?;
    Ok(Json(DraftView::from(&draft)))
}

// ============================================================================
// Payment
// ============================================================================

/// GET /v1/bookings/{id}/payment-gateways
async fn get_payment_gateways(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentGateway>>, AppError> {
    let result = state.bookings.payment_gateways(id).await;
    Ok(Json(settle(&state, id, result).await?))
}

/// POST /v1/bookings/{id}/payment
/// Submit the reservation to the PMS
async fn submit_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(choice): Json<PaymentChoice>,
) -> Result<Json<PaymentResponse>, AppError> {
    let result = state.bookings.submit_payment(id, choice).await;
    let draft = settle(&state, id, result).await?;

    let reservation_no = draft
        .reservation_no
        .ok_or_else(|| AppError::InternalServerError("confirmed draft without reservation number".to_string()))?;

    Ok(Json(PaymentResponse {
        reservation_no,
        confirmation_url: format!("/v1/bookings/{}/confirmation", id),
    }))
}

// ============================================================================
// Confirmation
// ============================================================================

/// GET /v1/bookings/{id}/confirmation
/// Served once; the draft is discarded afterwards
async fn get_confirmation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmationSummary>, AppError> {
    let summary = state.bookings.confirmation(id).await?;
    Ok(Json(summary))
}

use arboreal_catalog::calendar::is_selectable;
use arboreal_catalog::{CalendarMonth, ClickOutcome, MonthView, PricingError, RangeSelection, StayPricer};
use arboreal_core::guest::PersonalInfo;
use arboreal_core::payment::{PaymentChoice, PaymentMode};
use arboreal_core::pms::{PaymentGateway, PmsClient, PmsError};
use arboreal_core::room::RoomOffer;
use arboreal_core::search::SearchCriteria;
use arboreal_core::CoreError;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::confirmation::ConfirmationSummary;
use crate::extras::{RecalcTicket, Recalculation};
use crate::models::{BookingDraft, Stage, StaySummary};
use crate::orchestrator::BookingOrchestrator;
use crate::repository::{DraftRepository, StoreError};

/// Drives booking drafts through their stages.
///
/// Every mutation loads the draft, checks its stage, applies the change and saves it back
/// while holding that draft's lock. Extras quotes run outside the lock and re-acquire it
/// only to apply their result.
pub struct BookingManager {
    repo: Arc<dyn DraftRepository>,
    pms: Arc<dyn PmsClient>,
    orchestrator: BookingOrchestrator,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl BookingManager {
    pub fn new(repo: Arc<dyn DraftRepository>, pms: Arc<dyn PmsClient>) -> Self {
        Self {
            repo,
            orchestrator: BookingOrchestrator::new(pms.clone()),
            pms,
            locks: DashMap::new(),
        }
    }

    /// Start a draft for the room the guest picked from the availability results.
    pub async fn start(&self, room: RoomOffer, search: SearchCriteria) -> Result<BookingDraft, BookingError> {
        search.validate()?;
        let draft = BookingDraft::new(room, search);
        self.repo.save(&draft).await?;
        tracing::info!(draft_id = %draft.id, room = %draft.room.display_name(), "Booking draft started");
        Ok(draft)
    }

    pub async fn get(&self, id: Uuid) -> Result<BookingDraft, BookingError> {
        self.repo.get(id).await?.ok_or(BookingError::NotFound(id))
    }

    /// Drops a draft, e.g. after a navigation-state error.
    pub async fn discard(&self, id: Uuid) -> Result<(), BookingError> {
        self.repo.delete(id).await?;
        self.locks.remove(&id);
        tracing::debug!(draft_id = %id, "Booking draft discarded");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Date selection
    // ------------------------------------------------------------------

    /// Month view for the calendar. Defaults to the month of the current check-in.
    pub async fn calendar(
        &self,
        id: Uuid,
        month: Option<CalendarMonth>,
        today: NaiveDate,
    ) -> Result<MonthView, BookingError> {
        let draft = self.get(id).await?;
        require_stage(&draft, Stage::DateSelection)?;

        let month = month
            .unwrap_or_else(|| CalendarMonth::containing(draft.calendar.check_in.unwrap_or(today)))
            .clamp_to(today);

        Ok(MonthView::render(&draft.room, &draft.calendar, month, today))
    }

    pub async fn select_date(
        &self,
        id: Uuid,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<(ClickOutcome, RangeSelection), BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::DateSelection)?;

        let outcome = draft.calendar.click(date, today);
        if outcome != ClickOutcome::Ignored {
            draft.touch();
            self.repo.save(&draft).await?;
        }
        Ok((outcome, draft.calendar))
    }

    /// Fix the selected range, price it and move on to personal info.
    pub async fn confirm_dates(&self, id: Uuid, today: NaiveDate) -> Result<BookingDraft, BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::DateSelection)?;

        let (check_in, check_out) = draft.calendar.range().ok_or_else(|| {
            BookingError::Validation("Please select both check-in and check-out dates".to_string())
        })?;
        // Seeded search dates never went through a click
        if !is_selectable(check_in, today) {
            return Err(BookingError::Validation(
                "Check-in date is in the past, please pick new dates".to_string(),
            ));
        }

        let quote = StayPricer::new(&draft.room).quote(check_in, check_out)?;
        let fallback_nights = quote.nightly.iter().filter(|n| n.fallback).count();
        if fallback_nights > 0 {
            tracing::debug!(draft_id = %id, fallback_nights, "Unpriced nights charged at the average rate");
        }

        draft.search = draft.search.with_dates(check_in, check_out);
        draft.stay = Some(StaySummary::from(quote));
        draft.stage = Stage::PersonalInfo;
        draft.touch();
        self.repo.save(&draft).await?;

        tracing::info!(draft_id = %id, %check_in, %check_out, "Stay dates confirmed");
        Ok(draft)
    }

    // ------------------------------------------------------------------
    // Personal info
    // ------------------------------------------------------------------

    pub async fn record_guest(&self, id: Uuid, info: PersonalInfo) -> Result<BookingDraft, BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::PersonalInfo)?;
        require_stay(&draft)?;
        info.check()?;

        tracing::debug!(draft_id = %id, guest = ?info, "Guest details recorded");
        draft.guest = Some(info);
        draft.stage = Stage::Extras;
        draft.touch();
        self.repo.save(&draft).await?;
        Ok(draft)
    }

    // ------------------------------------------------------------------
    // Extras
    // ------------------------------------------------------------------

    /// Enter the extras stage, fetching the catalog on first entry.
    pub async fn open_extras(&self, id: Uuid) -> Result<BookingDraft, BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::Extras)?;
        require_stay(&draft)?;
        require_guest(&draft)?;

        if draft.extras_catalog.is_empty() {
            draft.extras_catalog = self.pms.list_extras().await?;
            tracing::debug!(draft_id = %id, count = draft.extras_catalog.len(), "Extras catalog loaded");
            draft.touch();
            self.repo.save(&draft).await?;
        }
        Ok(draft)
    }

    pub async fn toggle_extra(self: &Arc<Self>, id: Uuid, extra_id: &str) -> Result<BookingDraft, BookingError> {
        let (draft, recalc) = {
            let lock = self.lock_for(id);
            let _guard = lock.lock().await;

            let mut draft = self.load(id).await?;
            require_stage(&draft, Stage::Extras)?;
            if draft.extra(extra_id).is_none() {
                return Err(BookingError::Validation(format!("Unknown extra: {}", extra_id)));
            }

            let recalc = draft.extras.toggle(extra_id);
            draft.touch();
            self.repo.save(&draft).await?;
            (draft, recalc)
        };

        self.dispatch(&draft, recalc);
        Ok(draft)
    }

    /// Change the quantity of a selected per-quantity extra. Quantities below one are ignored.
    pub async fn set_extra_quantity(
        self: &Arc<Self>,
        id: Uuid,
        extra_id: &str,
        quantity: u32,
    ) -> Result<BookingDraft, BookingError> {
        let (draft, recalc) = {
            let lock = self.lock_for(id);
            let _guard = lock.lock().await;

            let mut draft = self.load(id).await?;
            require_stage(&draft, Stage::Extras)?;
            match draft.extra(extra_id) {
                None => return Err(BookingError::Validation(format!("Unknown extra: {}", extra_id))),
                Some(extra) if !extra.is_per_quantity() => {
                    return Err(BookingError::Validation(format!(
                        "{} is not sold per quantity",
                        extra.label
                    )))
                }
                Some(_) => {}
            }

            let recalc = draft.extras.set_quantity(extra_id, quantity);
            if recalc != Recalculation::Unchanged {
                draft.touch();
                self.repo.save(&draft).await?;
            }
            (draft, recalc)
        };

        self.dispatch(&draft, recalc);
        Ok(draft)
    }

    fn dispatch(self: &Arc<Self>, draft: &BookingDraft, recalc: Recalculation) {
        let ticket = match recalc {
            Recalculation::Pending(ticket) => ticket,
            Recalculation::Cleared => {
                tracing::debug!(draft_id = %draft.id, "Extras cleared, charge reset to zero");
                return;
            }
            Recalculation::Unchanged => return,
        };

        let manager = Arc::clone(self);
        let id = draft.id;
        tokio::spawn(async move {
            if let Err(e) = manager.recalculate(id, ticket).await {
                tracing::error!(draft_id = %id, "Extras recalculation failed to persist: {}", e);
            }
        });
    }

    /// Ask the PMS for a quote and apply it if it is still the latest one.
    pub async fn recalculate(&self, id: Uuid, ticket: RecalcTicket) -> Result<(), BookingError> {
        let stay = match self.repo.get(id).await? {
            Some(draft) => draft.stay,
            None => None,
        };
        let Some(stay) = stay else {
            tracing::debug!(draft_id = %id, seq = ticket.seq, "Draft gone before extras quote was requested");
            return Ok(());
        };

        let request = ticket.request(stay.check_in, stay.check_out);
        let quote = self.pms.calculate_extras(&request).await;

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let Some(mut draft) = self.repo.get(id).await? else {
            tracing::debug!(draft_id = %id, seq = ticket.seq, "Dropping extras quote for discarded draft");
            self.locks.remove(&id);
            return Ok(());
        };
        if draft.stage != Stage::Extras {
            tracing::debug!(draft_id = %id, seq = ticket.seq, "Dropping extras quote, draft has moved on");
            return Ok(());
        }

        let applied = match quote {
            Ok(quote) => {
                let applied = draft.extras.apply_charge(ticket.seq, quote.total_charge);
                if applied {
                    tracing::debug!(draft_id = %id, seq = ticket.seq, total = %quote.total_charge, "Extras charge updated");
                }
                applied
            }
            Err(e) => {
                tracing::warn!(draft_id = %id, seq = ticket.seq, "Extras quote failed: {}", e);
                draft.extras.abandon(ticket.seq)
            }
        };

        if !applied {
            tracing::debug!(
                draft_id = %id,
                seq = ticket.seq,
                latest = draft.extras.issued_seq,
                "Discarding stale extras quote"
            );
            return Ok(());
        }

        draft.touch();
        self.repo.save(&draft).await?;
        Ok(())
    }

    pub async fn skip_extras(&self, id: Uuid) -> Result<BookingDraft, BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::Extras)?;

        draft.extras.clear();
        draft.extras_charge = Some(Decimal::ZERO);
        draft.stage = Stage::Payment;
        draft.touch();
        self.repo.save(&draft).await?;

        tracing::info!(draft_id = %id, "Extras skipped");
        Ok(draft)
    }

    /// Fix the current extras charge and move on to payment.
    pub async fn continue_extras(&self, id: Uuid) -> Result<BookingDraft, BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::Extras)?;

        if draft.extras.is_calculating() {
            return Err(BookingError::Conflict(
                "Extras total is still being calculated".to_string(),
            ));
        }

        draft.extras_charge = Some(draft.extras.charge);
        draft.stage = Stage::Payment;
        draft.touch();
        self.repo.save(&draft).await?;

        tracing::info!(
            draft_id = %id,
            extras = draft.extras.selected.len(),
            charge = %draft.extras.charge,
            "Extras fixed"
        );
        Ok(draft)
    }

    // ------------------------------------------------------------------
    // Payment
    // ------------------------------------------------------------------

    pub async fn payment_gateways(&self, id: Uuid) -> Result<Vec<PaymentGateway>, BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::Payment)?;

        let gateways = self.pms.list_payment_gateways().await?;
        draft.gateways = gateways.clone();
        draft.touch();
        self.repo.save(&draft).await?;
        Ok(gateways)
    }

    /// Submit the reservation. A failed submission leaves the draft at the payment stage.
    pub async fn submit_payment(&self, id: Uuid, choice: PaymentChoice) -> Result<BookingDraft, BookingError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut draft = self.load(id).await?;
        require_stage(&draft, Stage::Payment)?;
        require_stay(&draft)?;
        require_guest(&draft)?;
        choice.validate()?;

        if choice.mode == PaymentMode::Card && choice.gateway_id.is_none() && draft.gateways.is_empty() {
            draft.gateways = self.pms.list_payment_gateways().await?;
        }

        let submission = self.orchestrator.submit(&draft, &choice, &draft.gateways).await?;

        draft.reservation_no = Some(submission.reservation_no);
        draft.payment = Some(submission.payment);
        draft.stage = Stage::Confirmed;
        draft.touch();
        self.repo.save(&draft).await?;
        Ok(draft)
    }

    // ------------------------------------------------------------------
    // Confirmation
    // ------------------------------------------------------------------

    /// Summary of a confirmed booking. The draft is discarded once the summary is built.
    pub async fn confirmation(&self, id: Uuid) -> Result<ConfirmationSummary, BookingError> {
        let lock = self.lock_for(id);
        let guard = lock.lock().await;

        let Some(draft) = self.repo.get(id).await? else {
            self.locks.remove(&id);
            return Err(BookingError::NotConfirmed);
        };
        let summary = ConfirmationSummary::from_draft(&draft).ok_or(BookingError::NotConfirmed)?;

        drop(guard);
        self.discard(id).await?;
        Ok(summary)
    }

    /// Drops expired drafts from the store and releases idle locks of drafts that no longer exist.
    pub async fn sweep(&self) -> Result<SweepReport, BookingError> {
        let purged_drafts = self.repo.purge_expired().await?;

        let idle: Vec<Uuid> = self
            .locks
            .iter()
            .filter(|entry| Arc::strong_count(entry.value()) == 1)
            .map(|entry| *entry.key())
            .collect();

        let mut released_locks = 0;
        for id in idle {
            if self.repo.get(id).await?.is_some() {
                continue;
            }
            if self
                .locks
                .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1)
                .is_some()
            {
                released_locks += 1;
            }
        }

        Ok(SweepReport { purged_drafts, released_locks })
    }

    fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_default().clone()
    }

    /// Loads a draft while its lock is held. Unknown ids leave no lock behind.
    async fn load(&self, id: Uuid) -> Result<BookingDraft, BookingError> {
        match self.repo.get(id).await? {
            Some(draft) => Ok(draft),
            None => {
                self.locks.remove(&id);
                Err(BookingError::NotFound(id))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub purged_drafts: usize,
    pub released_locks: usize,
}

/// Earlier stages are navigation-state errors; later stages are conflicts.
fn require_stage(draft: &BookingDraft, expected: Stage) -> Result<(), BookingError> {
    if draft.stage < expected {
        return Err(BookingError::MissingPrerequisite("earlier booking steps"));
    }
    if draft.stage > expected {
        return Err(BookingError::InvalidTransition {
            from: draft.stage.as_str().to_string(),
            to: expected.as_str().to_string(),
        });
    }
    Ok(())
}

fn require_stay(draft: &BookingDraft) -> Result<(), BookingError> {
    draft
        .stay
        .as_ref()
        .map(|_| ())
        .ok_or(BookingError::MissingPrerequisite("stay dates"))
}

fn require_guest(draft: &BookingDraft) -> Result<(), BookingError> {
    draft
        .guest
        .as_ref()
        .map(|_| ())
        .ok_or(BookingError::MissingPrerequisite("guest details"))
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking draft not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("Booking draft is missing {0}")]
    MissingPrerequisite(&'static str),

    #[error("Booking has no reservation number")]
    NotConfirmed,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Pms(#[from] PmsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal booking error: {0}")]
    Internal(String),
}

impl From<CoreError> for BookingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => BookingError::Validation(msg),
            CoreError::InternalError(msg) => BookingError::Internal(msg),
        }
    }
}

impl From<PricingError> for BookingError {
    fn from(err: PricingError) -> Self {
        BookingError::Validation(err.to_string())
    }
}

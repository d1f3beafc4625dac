pub mod models;
pub mod manager;
pub mod extras;
pub mod payload;
pub mod orchestrator;
pub mod confirmation;
pub mod repository;

pub use models::{BookingDraft, PaymentRecord, Stage, StaySummary};
pub use manager::{BookingError, BookingManager, SweepReport};
pub use extras::{ExtrasSelection, Recalculation, RecalcTicket, SelectedExtra};
pub use orchestrator::{BookingOrchestrator, Submission};
pub use confirmation::ConfirmationSummary;
pub use repository::{DraftRepository, StoreError};

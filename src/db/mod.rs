//! Persistence for users, events and the three per-(user, event) relations.
//!
//! The reservation rules live in [`crate::services`]; a [`Store`] only has to
//! provide keyed reads and writes plus the atomic compound operations: the
//! capacity-guarded RSVP insert, the RSVP cancellation cascade, the
//! RSVP-checked payment upsert and the marker-guarded seed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Event, EventSummary, Interest, InterestedUser, NewEvent, Payment, PaymentUpsert, Rsvp,
    RsvpCancellation, RsvpInsert, SeedOutcome, User,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    async fn insert_event(
        &self,
        event: &NewEvent,
        created_by: Option<Uuid>,
    ) -> Result<Event, AppError>;

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, AppError>;

    /// Inserts `events` unless an event titled `marker_title` exists. The
    /// check and the inserts are serialized against other seeds.
    async fn seed_events(
        &self,
        marker_title: &str,
        events: &[NewEvent],
    ) -> Result<SeedOutcome, AppError>;

    /// Events dated at or after `now`, soonest first, with counts and the
    /// viewer's flags. Without a viewer every flag is false.
    async fn list_event_summaries(
        &self,
        now: DateTime<Utc>,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<EventSummary>, AppError>;

    async fn get_rsvp(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Rsvp>, AppError>;

    /// Inserts an RSVP unless the pair already has one or the event is full.
    /// The duplicate check, the count and the insert happen under one lock
    /// scoped to the event.
    async fn insert_rsvp_within_capacity(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<RsvpInsert, AppError>;

    /// Deletes the RSVP and the pair's pending payment in one unit. Returns
    /// `None` when no RSVP existed.
    async fn cancel_rsvp(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<RsvpCancellation>, AppError>;

    /// Returns `None` when the pair is already interested.
    async fn insert_interest(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Interest>, AppError>;

    async fn delete_interest(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError>;

    /// Interested users, most recent interest first.
    async fn list_interested_users(&self, event_id: Uuid)
        -> Result<Vec<InterestedUser>, AppError>;

    async fn get_payment(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Payment>, AppError>;

    /// Creates the pair's pending payment, or resets an existing pending one
    /// to `amount`. The pair's RSVP must exist for the duration of the write
    /// and a completed payment is never reopened.
    async fn upsert_pending_payment(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        amount: Decimal,
    ) -> Result<PaymentUpsert, AppError>;

    /// Marks the payment completed. Applying it twice is harmless.
    async fn complete_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError>;
}

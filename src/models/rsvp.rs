use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rsvp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Outcome of the guarded RSVP insert. The store decides between these
/// while holding the per-event lock.
#[derive(Debug)]
pub enum RsvpInsert {
    Created(Rsvp),
    AlreadyExists,
    AtCapacity,
}

/// Rows removed by an RSVP cancellation.
#[derive(Debug, Clone, Copy)]
pub struct RsvpCancellation {
    pub pending_payments_removed: u64,
}

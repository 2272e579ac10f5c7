use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub price: Decimal,
    pub max_attendees: Option<i32>,
    pub image: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

/// Fields accepted when an admin creates an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub price: Decimal,
    pub max_attendees: Option<i32>,
    pub image: Option<String>,
}

/// An upcoming event as seen by one viewer.
///
/// Only aggregate counts and the viewer's own flags are exposed, never the
/// underlying RSVP, interest or payment rows.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub event: Event,
    pub attendee_count: i64,
    pub interested_count: i64,
    #[serde(rename = "userRSVP")]
    pub user_rsvp: bool,
    pub user_interested: bool,
    pub user_paid: bool,
}

/// Result of seeding a batch of events keyed by a marker title.
#[derive(Debug)]
pub enum SeedOutcome {
    Created(Vec<Event>),
    /// An event with the marker title was already present; nothing was written.
    Existing(Event),
}

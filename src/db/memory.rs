use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Store;
use crate::models::{
    Event, EventSummary, Interest, InterestedUser, NewEvent, Payment, PaymentStatus,
    PaymentUpsert, Rsvp, RsvpCancellation, RsvpInsert, SeedOutcome, User,
};
use crate::utils::error::AppError;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    rsvps: Vec<Rsvp>,
    interests: Vec<Interest>,
    payments: Vec<Payment>,
}

/// In-process [`Store`] used by tests and local demos.
///
/// A single mutex guards every table, so each trait call is one critical
/// section and the compound operations are atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account, standing in for the auth service's user table.
    pub async fn add_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }
}

fn event_row(event: &NewEvent, created_by: Option<Uuid>) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: event.title.clone(),
        description: event.description.clone(),
        date: event.date,
        location: event.location.clone(),
        price: event.price,
        max_attendees: event.max_attendees,
        image: event.image.clone(),
        created_by,
        created_at: now,
        updated_at: now,
    }
}

fn same_pair(user_id: Uuid, event_id: Uuid) -> impl Fn(&(Uuid, Uuid)) -> bool {
    move |&(u, e)| u == user_id && e == event_id
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn insert_event(
        &self,
        event: &NewEvent,
        created_by: Option<Uuid>,
    ) -> Result<Event, AppError> {
        let row = event_row(event, created_by);
        self.tables.lock().await.events.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.tables.lock().await.events.get(&event_id).cloned())
    }

    async fn seed_events(
        &self,
        marker_title: &str,
        events: &[NewEvent],
    ) -> Result<SeedOutcome, AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .events
            .values()
            .filter(|e| e.title == marker_title)
            .min_by_key(|e| e.created_at)
        {
            return Ok(SeedOutcome::Existing(existing.clone()));
        }

        let created: Vec<Event> = events.iter().map(|event| event_row(event, None)).collect();
        for row in &created {
            tables.events.insert(row.id, row.clone());
        }
        Ok(SeedOutcome::Created(created))
    }

    async fn list_event_summaries(
        &self,
        now: DateTime<Utc>,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<EventSummary>, AppError> {
        let tables = self.tables.lock().await;
        let mut events: Vec<&Event> = tables.events.values().filter(|e| e.date >= now).collect();
        events.sort_by_key(|e| e.date);

        let summaries = events
            .into_iter()
            .map(|event| {
                let is_viewer = |user_id: Uuid| viewer_id == Some(user_id);
                EventSummary {
                    attendee_count: tables.rsvps.iter().filter(|r| r.event_id == event.id).count()
                        as i64,
                    interested_count: tables
                        .interests
                        .iter()
                        .filter(|i| i.event_id == event.id)
                        .count() as i64,
                    user_rsvp: tables
                        .rsvps
                        .iter()
                        .any(|r| r.event_id == event.id && is_viewer(r.user_id)),
                    user_interested: tables
                        .interests
                        .iter()
                        .any(|i| i.event_id == event.id && is_viewer(i.user_id)),
                    user_paid: tables.payments.iter().any(|p| {
                        p.event_id == event.id && is_viewer(p.user_id) && p.is_completed()
                    }),
                    event: event.clone(),
                }
            })
            .collect();
        Ok(summaries)
    }

    async fn get_rsvp(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Rsvp>, AppError> {
        let matches = same_pair(user_id, event_id);
        Ok(self
            .tables
            .lock()
            .await
            .rsvps
            .iter()
            .find(|r| matches(&(r.user_id, r.event_id)))
            .cloned())
    }

    async fn insert_rsvp_within_capacity(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<RsvpInsert, AppError> {
        let mut tables = self.tables.lock().await;
        let capacity = match tables.events.get(&event_id) {
            Some(event) => event.max_attendees,
            None => return Err(AppError::NotFound("Event not found".to_string())),
        };

        let matches = same_pair(user_id, event_id);
        if tables.rsvps.iter().any(|r| matches(&(r.user_id, r.event_id))) {
            return Ok(RsvpInsert::AlreadyExists);
        }

        if let Some(max) = capacity {
            let count = tables.rsvps.iter().filter(|r| r.event_id == event_id).count();
            if count as i64 >= i64::from(max) {
                return Ok(RsvpInsert::AtCapacity);
            }
        }

        let rsvp = Rsvp {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            created_at: Utc::now(),
        };
        tables.rsvps.push(rsvp.clone());
        Ok(RsvpInsert::Created(rsvp))
    }

    async fn cancel_rsvp(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<RsvpCancellation>, AppError> {
        let mut tables = self.tables.lock().await;
        let matches = same_pair(user_id, event_id);

        let before = tables.rsvps.len();
        tables.rsvps.retain(|r| !matches(&(r.user_id, r.event_id)));
        if tables.rsvps.len() == before {
            return Ok(None);
        }

        let before = tables.payments.len();
        tables
            .payments
            .retain(|p| !(matches(&(p.user_id, p.event_id)) && p.status == PaymentStatus::Pending));
        let pending_payments_removed = (before - tables.payments.len()) as u64;

        Ok(Some(RsvpCancellation {
            pending_payments_removed,
        }))
    }

    async fn insert_interest(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Interest>, AppError> {
        let mut tables = self.tables.lock().await;
        let matches = same_pair(user_id, event_id);
        if tables.interests.iter().any(|i| matches(&(i.user_id, i.event_id))) {
            return Ok(None);
        }

        let interest = Interest {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            created_at: Utc::now(),
        };
        tables.interests.push(interest.clone());
        Ok(Some(interest))
    }

    async fn delete_interest(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        let matches = same_pair(user_id, event_id);
        let before = tables.interests.len();
        tables.interests.retain(|i| !matches(&(i.user_id, i.event_id)));
        Ok(tables.interests.len() < before)
    }

    async fn list_interested_users(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<InterestedUser>, AppError> {
        let tables = self.tables.lock().await;
        // Newest first; later insertions win timestamp ties.
        let mut rows: Vec<InterestedUser> = tables
            .interests
            .iter()
            .rev()
            .filter(|i| i.event_id == event_id)
            .filter_map(|i| {
                tables.users.get(&i.user_id).map(|u| InterestedUser {
                    id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    created_at: i.created_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_payment(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let matches = same_pair(user_id, event_id);
        Ok(self
            .tables
            .lock()
            .await
            .payments
            .iter()
            .find(|p| matches(&(p.user_id, p.event_id)))
            .cloned())
    }

    async fn upsert_pending_payment(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        amount: Decimal,
    ) -> Result<PaymentUpsert, AppError> {
        let mut tables = self.tables.lock().await;
        let matches = same_pair(user_id, event_id);
        let now = Utc::now();

        if !tables.rsvps.iter().any(|r| matches(&(r.user_id, r.event_id))) {
            return Ok(PaymentUpsert::MissingRsvp);
        }

        if let Some(existing) = tables
            .payments
            .iter_mut()
            .find(|p| matches(&(p.user_id, p.event_id)))
        {
            if existing.is_completed() {
                return Ok(PaymentUpsert::AlreadyCompleted);
            }
            existing.amount = amount;
            existing.updated_at = now;
            return Ok(PaymentUpsert::Opened(existing.clone()));
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            amount,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.payments.push(payment.clone());
        Ok(PaymentUpsert::Opened(payment))
    }

    async fn complete_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .map(|payment| {
                payment.status = PaymentStatus::Completed;
                payment.updated_at = Utc::now();
                payment.clone()
            }))
    }
}

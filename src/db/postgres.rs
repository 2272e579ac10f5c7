use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::Store;
use crate::models::{
    Event, EventSummary, Interest, InterestedUser, NewEvent, Payment, PaymentStatus,
    PaymentUpsert, Rsvp, RsvpCancellation, RsvpInsert, SeedOutcome, User,
};
use crate::utils::error::AppError;

const EVENT_COLUMNS: &str = "id, title, description, date, location, price, max_attendees, \
     image, created_by, created_at, updated_at";
const PAYMENT_COLUMNS: &str = "id, user_id, event_id, amount, status, created_at, updated_at";

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_event_row<'e, E>(
    executor: E,
    event: &NewEvent,
    created_by: Option<Uuid>,
) -> Result<Event, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO events (id, title, description, date, location, price, max_attendees, image, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {EVENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.date)
    .bind(&event.location)
    .bind(event.price)
    .bind(event.max_attendees)
    .bind(&event.image)
    .bind(created_by)
    .fetch_one(executor)
    .await
}

#[async_trait]
impl Store for PgStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_event(
        &self,
        event: &NewEvent,
        created_by: Option<Uuid>,
    ) -> Result<Event, AppError> {
        Ok(insert_event_row(&self.pool, event, created_by).await?)
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, AppError> {
        let row = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn seed_events(
        &self,
        marker_title: &str,
        events: &[NewEvent],
    ) -> Result<SeedOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Concurrent seeds queue on this lock; it is released at commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(marker_title)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE title = $1 ORDER BY created_at LIMIT 1"
        ))
        .bind(marker_title)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing) = existing {
            return Ok(SeedOutcome::Existing(existing));
        }

        let mut created = Vec::with_capacity(events.len());
        for event in events {
            created.push(insert_event_row(&mut *tx, event, None).await?);
        }

        tx.commit().await?;
        Ok(SeedOutcome::Created(created))
    }

    async fn list_event_summaries(
        &self,
        now: DateTime<Utc>,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<EventSummary>, AppError> {
        let rows = sqlx::query_as::<_, EventSummary>(
            "SELECT e.id, e.title, e.description, e.date, e.location, e.price, e.max_attendees,
                    e.image, e.created_by, e.created_at, e.updated_at,
                    (SELECT COUNT(*) FROM rsvps r WHERE r.event_id = e.id) AS attendee_count,
                    (SELECT COUNT(*) FROM interests i WHERE i.event_id = e.id) AS interested_count,
                    EXISTS (
                        SELECT 1 FROM rsvps r WHERE r.event_id = e.id AND r.user_id = $2
                    ) AS user_rsvp,
                    EXISTS (
                        SELECT 1 FROM interests i WHERE i.event_id = e.id AND i.user_id = $2
                    ) AS user_interested,
                    EXISTS (
                        SELECT 1 FROM payments p
                        WHERE p.event_id = e.id AND p.user_id = $2 AND p.status = $3
                    ) AS user_paid
             FROM events e
             WHERE e.date >= $1
             ORDER BY e.date ASC",
        )
        .bind(now)
        .bind(viewer_id)
        .bind(PaymentStatus::Completed)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_rsvp(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Rsvp>, AppError> {
        let row = sqlx::query_as::<_, Rsvp>(
            "SELECT id, user_id, event_id, created_at FROM rsvps
             WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_rsvp_within_capacity(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<RsvpInsert, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the event serializes concurrent RSVPs for it until commit.
        let capacity: Option<Option<i32>> =
            sqlx::query_scalar("SELECT max_attendees FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(capacity) = capacity else {
            return Err(AppError::NotFound("Event not found".to_string()));
        };

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM rsvps WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Ok(RsvpInsert::AlreadyExists);
        }

        if let Some(max) = capacity {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rsvps WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;
            if count >= i64::from(max) {
                return Ok(RsvpInsert::AtCapacity);
            }
        }

        let rsvp = sqlx::query_as::<_, Rsvp>(
            "INSERT INTO rsvps (id, user_id, event_id) VALUES ($1, $2, $3)
             RETURNING id, user_id, event_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RsvpInsert::Created(rsvp))
    }

    async fn cancel_rsvp(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<RsvpCancellation>, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM rsvps WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(None);
        }

        let pending_payments_removed = sqlx::query(
            "DELETE FROM payments WHERE user_id = $1 AND event_id = $2 AND status = $3",
        )
        .bind(user_id)
        .bind(event_id)
        .bind(PaymentStatus::Pending)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(Some(RsvpCancellation {
            pending_payments_removed,
        }))
    }

    async fn insert_interest(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Interest>, AppError> {
        let row = sqlx::query_as::<_, Interest>(
            "INSERT INTO interests (id, user_id, event_id) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, event_id) DO NOTHING
             RETURNING id, user_id, event_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_interest(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM interests WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn list_interested_users(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<InterestedUser>, AppError> {
        let rows = sqlx::query_as::<_, InterestedUser>(
            "SELECT u.id, u.name, u.email, i.created_at
             FROM interests i
             JOIN users u ON u.id = i.user_id
             WHERE i.event_id = $1
             ORDER BY i.created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_payment(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_pending_payment(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        amount: Decimal,
    ) -> Result<PaymentUpsert, AppError> {
        let mut tx = self.pool.begin().await?;

        // The share lock holds off a cancellation's DELETE until commit, so
        // its cascade sees the payment written here.
        let rsvp: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM rsvps WHERE user_id = $1 AND event_id = $2 FOR SHARE",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;
        if rsvp.is_none() {
            return Ok(PaymentUpsert::MissingRsvp);
        }

        // The conditional DO UPDATE leaves a completed row untouched and
        // returns nothing for it.
        let row = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (id, user_id, event_id, amount, status)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, event_id) DO UPDATE
                 SET amount = EXCLUDED.amount, updated_at = NOW()
                 WHERE payments.status = $5
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .bind(amount)
        .bind(PaymentStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(match row {
            Some(payment) => PaymentUpsert::Opened(payment),
            None => PaymentUpsert::AlreadyCompleted,
        })
    }

    async fn complete_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(payment_id)
        .bind(PaymentStatus::Completed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

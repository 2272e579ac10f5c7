//! RSVP, interest and payment tracks for a (user, event) pair.
//!
//! The three tracks are independent relations. Every rule is checked before
//! anything is written; the capacity check and the cancellation cascade are
//! delegated to atomic store operations.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::Store;
use crate::models::{
    Event, Interest, InterestedUser, Payment, PaymentSession, PaymentUpsert, Rsvp,
    RsvpCancellation, RsvpInsert,
};
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<dyn Store>,
    payment_return_url: String,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn Store>, payment_return_url: String) -> Self {
        Self {
            store,
            payment_return_url,
        }
    }

    async fn require_event(&self, event_id: Uuid) -> Result<Event, AppError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn create_rsvp(&self, identity: &Identity, event_id: Uuid) -> Result<Rsvp, AppError> {
        let event = self.require_event(event_id).await?;
        if event.date <= Utc::now() {
            return Err(AppError::InvalidState(
                "Cannot RSVP to past events".to_string(),
            ));
        }

        match self
            .store
            .insert_rsvp_within_capacity(identity.user_id, event_id)
            .await?
        {
            RsvpInsert::Created(rsvp) => {
                tracing::info!(user_id = %identity.user_id, event_id = %event_id, "RSVP created");
                Ok(rsvp)
            }
            RsvpInsert::AlreadyExists => Err(AppError::Conflict(
                "Already RSVP'd to this event".to_string(),
            )),
            RsvpInsert::AtCapacity => Err(AppError::CapacityExceeded(
                "Event is at capacity".to_string(),
            )),
        }
    }

    pub async fn cancel_rsvp(
        &self,
        identity: &Identity,
        event_id: Uuid,
    ) -> Result<RsvpCancellation, AppError> {
        let cancellation = self
            .store
            .cancel_rsvp(identity.user_id, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("RSVP not found".to_string()))?;

        tracing::info!(
            user_id = %identity.user_id,
            event_id = %event_id,
            pending_payments_removed = cancellation.pending_payments_removed,
            "RSVP cancelled"
        );
        Ok(cancellation)
    }

    pub async fn mark_interest(
        &self,
        identity: &Identity,
        event_id: Uuid,
    ) -> Result<Interest, AppError> {
        self.require_event(event_id).await?;

        self.store
            .insert_interest(identity.user_id, event_id)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Already marked as interested in this event".to_string())
            })
    }

    pub async fn remove_interest(&self, identity: &Identity, event_id: Uuid) -> Result<(), AppError> {
        if self.store.delete_interest(identity.user_id, event_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Interest not found".to_string()))
        }
    }

    pub async fn list_interested(
        &self,
        identity: &Identity,
        event_id: Uuid,
    ) -> Result<Vec<InterestedUser>, AppError> {
        identity.require_admin()?;
        self.require_event(event_id).await?;
        self.store.list_interested_users(event_id).await
    }

    /// Opens (or reopens) the pending payment for the caller's RSVP and returns
    /// the checkout continuation.
    pub async fn create_payment(
        &self,
        identity: &Identity,
        event_id: Uuid,
    ) -> Result<PaymentSession, AppError> {
        let event = self.require_event(event_id).await?;

        // Early reads keep the rejection order stable; the upsert re-checks
        // the RSVP and the payment status atomically.
        if self.store.get_rsvp(identity.user_id, event_id).await?.is_none() {
            return Err(missing_rsvp());
        }

        let existing = self.store.get_payment(identity.user_id, event_id).await?;
        if existing.as_ref().is_some_and(Payment::is_completed) {
            return Err(already_paid());
        }

        if event.is_free() {
            return Err(AppError::InvalidState("This is a free event".to_string()));
        }

        let payment = match self
            .store
            .upsert_pending_payment(identity.user_id, event_id, event.price)
            .await?
        {
            PaymentUpsert::Opened(payment) => payment,
            PaymentUpsert::AlreadyCompleted => return Err(already_paid()),
            PaymentUpsert::MissingRsvp => return Err(missing_rsvp()),
        };

        tracing::info!(payment_id = %payment.id, event_id = %event_id, amount = %payment.amount, "Payment session opened");

        Ok(PaymentSession {
            payment_url: format!("{}?payment={}", self.payment_return_url, payment.id),
            payment,
        })
    }

    /// Trusted processor callback; no caller identity is involved.
    pub async fn complete_payment(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        let payment = self
            .store
            .complete_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        tracing::info!(payment_id = %payment.id, "Payment completed");
        Ok(payment)
    }
}

fn missing_rsvp() -> AppError {
    AppError::InvalidState("Must RSVP before paying".to_string())
}

fn already_paid() -> AppError {
    AppError::Conflict("Already paid for this event".to_string())
}

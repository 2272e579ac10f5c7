use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::handlers::extract::{ApiJson, ApiQuery, EventId};
use crate::models::NewEvent;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl ListEventsQuery {
    /// The events page sends an empty `userId` for signed-out visitors.
    fn viewer_id(&self) -> Result<Option<Uuid>, AppError> {
        match self.user_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| AppError::ValidationError(format!("Invalid userId '{}'", raw))),
        }
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListEventsQuery>,
) -> Result<Response, AppError> {
    let events = state.events.list_upcoming_events(query.viewer_id()?).await?;
    Ok(success(events, "Events retrieved successfully"))
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<NewEvent>,
) -> Result<Response, AppError> {
    let event = state.events.create_event(&identity, payload).await?;
    Ok(created(event, "Event created successfully"))
}

pub async fn create_sample_events(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Response, AppError> {
    let samples = state.events.seed_sample_events(&identity).await?;
    let message = if samples.created {
        "Sample events created successfully"
    } else {
        "Sample event already exists"
    };
    Ok(success(samples.events, message))
}

pub async fn create_rsvp(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    EventId(event_id): EventId,
) -> Result<Response, AppError> {
    let rsvp = state.reservations.create_rsvp(&identity, event_id).await?;
    Ok(created(rsvp, "RSVP successful"))
}

pub async fn cancel_rsvp(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    EventId(event_id): EventId,
) -> Result<Response, AppError> {
    state.reservations.cancel_rsvp(&identity, event_id).await?;
    Ok(empty_success("RSVP cancelled successfully"))
}

pub async fn mark_interest(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    EventId(event_id): EventId,
) -> Result<Response, AppError> {
    let interest = state.reservations.mark_interest(&identity, event_id).await?;
    Ok(created(interest, "Interest marked successfully"))
}

pub async fn remove_interest(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    EventId(event_id): EventId,
) -> Result<Response, AppError> {
    state.reservations.remove_interest(&identity, event_id).await?;
    Ok(empty_success("Interest removed successfully"))
}

pub async fn list_interested(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    EventId(event_id): EventId,
) -> Result<Response, AppError> {
    let users = state.reservations.list_interested(&identity, event_id).await?;
    Ok(success(users, "Interested users retrieved successfully"))
}

pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    EventId(event_id): EventId,
) -> Result<Response, AppError> {
    let session = state.reservations.create_payment(&identity, event_id).await?;
    Ok(success(session, "Payment session created"))
}

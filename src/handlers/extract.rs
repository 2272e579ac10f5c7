//! Extractors whose rejections use the JSON error envelope.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::utils::error::AppError;

/// `:event_id` path segment. A segment that is not a UUID cannot name an
/// event, so it is reported as a missing event.
pub struct EventId(pub Uuid);

/// `:payment_id` path segment, same rules as [`EventId`].
pub struct PaymentId(pub Uuid);

async fn path_uuid<S>(parts: &mut Parts, state: &S, missing: &str) -> Result<Uuid, AppError>
where
    S: Send + Sync,
{
    Path::<Uuid>::from_request_parts(parts, state)
        .await
        .map(|Path(id)| id)
        .map_err(|rejection| {
            tracing::debug!(error = %rejection, "Unparseable path id");
            AppError::NotFound(missing.to_string())
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for EventId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        path_uuid(parts, state, "Event not found").await.map(EventId)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PaymentId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        path_uuid(parts, state, "Payment not found").await.map(PaymentId)
    }
}

/// `Json` with malformed bodies reported as `VALIDATION_ERROR`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
    }
}

/// `Query` with malformed query strings reported as `VALIDATION_ERROR`.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
    }
}

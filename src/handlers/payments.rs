use axum::extract::State;
use axum::response::Response;

use crate::handlers::extract::PaymentId;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Callback from the payment processor. Deliberately outside the bearer gate.
pub async fn complete_payment(
    State(state): State<AppState>,
    PaymentId(payment_id): PaymentId,
) -> Result<Response, AppError> {
    let payment = state.reservations.complete_payment(payment_id).await?;
    Ok(success(payment, "Payment completed"))
}

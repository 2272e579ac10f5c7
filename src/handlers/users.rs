use axum::extract::State;
use axum::response::Response;

use crate::auth::AuthUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Response, AppError> {
    let user = state
        .store
        .get_user(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(success(user, "Profile retrieved successfully"))
}

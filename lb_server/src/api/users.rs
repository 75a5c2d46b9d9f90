//! User registration and lookup handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use leaderboard::user::{NewUser, User, UserId};

use super::{
    AppState,
    errors::{ApiError, api_error, store_error},
};

/// Longest accepted username
pub const MAX_USERNAME_LEN: usize = 32;

fn validate_new_user(new_user: &NewUser) -> Result<(), ApiError> {
    let username = new_user.username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Username must be 1 to {MAX_USERNAME_LEN} characters"),
        ));
    }
    if new_user.coins.is_some_and(|coins| coins < 0) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Coins must not be negative"));
    }
    if new_user.level.is_some_and(|level| level < 1) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Level must be at least 1"));
    }
    Ok(())
}

/// Register a user.
///
/// Country, coins, and level fall back to their defaults when omitted.
///
/// # Response
///
/// `201 Created` with the stored user, `400` for invalid input, `409` when
/// the username is taken.
pub async fn create_user(
    State(state): State<AppState>,
    Json(mut new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    validate_new_user(&new_user)?;
    new_user.username = new_user.username.trim().to_string();

    let user = state.users.create_user(new_user).await.map_err(store_error)?;
    tracing::info!(user_id = %user.id, username = %user.username, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
    state
        .users
        .get_user(user_id)
        .await
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_bounds() {
        assert!(validate_new_user(&NewUser::named("ok")).is_ok());
        assert!(validate_new_user(&NewUser::named("   ")).is_err());
        assert!(validate_new_user(&NewUser::named("x".repeat(MAX_USERNAME_LEN + 1))).is_err());
    }

    #[test]
    fn test_negative_coins_rejected() {
        let (status, _) = validate_new_user(&NewUser::named("neg").with_coins(-1)).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

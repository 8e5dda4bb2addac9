use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, SignupRequest},
        error::ApiError,
        repo::User,
        services::{hash_password, is_valid_email, verify_password, JwtKeys},
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        warn!("signup missing username");
        return Err(ApiError::Validation("Username is required".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    if payload.password.len() < 6 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    // Email is checked before username. Both checks are read-then-write; the
    // unique constraints on the table are the safety net when two signups
    // race past them (see conflict_or_internal).
    match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::Conflict("Email is already registered".into()));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(ApiError::Internal(e));
        }
    }

    match User::find_by_username(&state.db, &payload.username).await {
        Ok(Some(_)) => {
            warn!(username = %payload.username, "username already taken");
            return Err(ApiError::Conflict(
                "Username is already taken, please choose another one".into(),
            ));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_username failed");
            return Err(ApiError::Internal(e));
        }
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(ApiError::Internal(e));
        }
    };

    let user = match User::create(&state.db, &payload.username, &payload.email, &hash).await {
        Ok(u) => u,
        Err(e) => return Err(conflict_or_internal(e)),
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".into(),
        }),
    ))
}

/// Maps a unique-violation on INSERT to the same 409 the pre-checks produce,
/// picking the message by constraint name.
fn conflict_or_internal(e: anyhow::Error) -> ApiError {
    if let Some(sqlx::Error::Database(db)) = e.downcast_ref::<sqlx::Error>() {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("users_username_key") => ApiError::Conflict(
                    "Username is already taken, please choose another one".into(),
                ),
                _ => ApiError::Conflict("Email is already registered".into()),
            };
        }
    }
    error!(error = %e, "create user failed");
    ApiError::Internal(e)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (username, password) = match (payload.username.as_deref(), payload.password.as_deref()) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => {
            warn!("login missing fields");
            return Err(ApiError::Validation(
                "Username and password are required".into(),
            ));
        }
    };

    let user = match User::find_by_username(&state.db, username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%username, "login unknown username");
            return Err(ApiError::NotFound("User not found".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_username failed");
            return Err(ApiError::Internal(e));
        }
    };

    let ok = match verify_password(password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err(ApiError::Internal(e));
        }
    };

    if !ok {
        // One message for any credential mismatch; never say which field failed.
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Validation("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = match keys.sign(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Err(ApiError::Internal(e));
        }
    };

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
        username: user.username,
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (email, new_password) = match (payload.email.as_deref(), payload.new_password.as_deref()) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e.trim().to_lowercase(), p),
        _ => {
            warn!("forgot-password missing fields");
            return Err(ApiError::Validation(
                "Email and new password are required".into(),
            ));
        }
    };

    let user = match User::find_by_email(&state.db, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%email, "forgot-password unknown email");
            return Err(ApiError::NotFound("User not found with this email".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(ApiError::Internal(e));
        }
    };

    let hash = match hash_password(new_password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(ApiError::Internal(e));
        }
    };

    if let Err(e) = User::update_password(&state.db, user.id, &hash).await {
        error!(error = %e, user_id = %user.id, "update_password failed");
        return Err(ApiError::Internal(e));
    }

    info!(user_id = %user.id, "password updated");
    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}

/// Full rows in creation order, password hashes included, no auth required.
/// Historical behavior of this API, and a defect rather than a feature; keep
/// this route off anything public.
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = match User::list_all(&state.db).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "list_all failed");
            return Err(ApiError::Internal(e));
        }
    };
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn users_listing_exposes_the_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("password_hash"));
        assert!(json.contains("$argon2id$"));
    }

    #[test]
    fn message_response_shape() {
        let res = MessageResponse {
            message: "User registered successfully".into(),
        };
        let json = serde_json::to_string(&res).unwrap();
        assert_eq!(json, r#"{"message":"User registered successfully"}"#);
    }
}

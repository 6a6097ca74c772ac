use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::handlers::users::ProfileResponse;
use crate::utils::crypto::hash_email;
use crate::utils::jwt::create_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: ProfileResponse,
}

fn validate_email(email: &str) -> AppResult<()> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::BadRequest("Invalid email address".to_string())),
    }
}

/// Register a new account. The display name defaults to the local part of
/// the email; the role starts as consumer until profile details are saved.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    validate_email(&payload.email)?;

    let email_hash = hash_email(&payload.email);

    // A placeholder user may already exist from a booking made with this
    // email; registering claims it by setting a password.
    let existing = user::Entity::find()
        .filter(user::Column::EmailHash.eq(&email_hash))
        .one(&state.db)
        .await?;

    if let Some(found) = &existing {
        if found.password_hash.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
    }

    // Hash password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    let email = payload.email.trim().to_string();
    let local_part = email.split('@').next().unwrap_or_default().to_string();

    let user = match existing {
        Some(found) => {
            let mut active: user::ActiveModel = found.into();
            active.password_hash = Set(Some(password_hash));
            active.update(&state.db).await?
        }
        None => {
            let new_user = user::ActiveModel {
                id: Set(Uuid::new_v4()),
                email_encrypted: Set(state.crypto.encrypt(&email)?),
                email_hash: Set(email_hash),
                password_hash: Set(Some(password_hash)),
                name: Set(Some(local_part)),
                role: Set(UserRole::Consumer),
                created_at: Set(Utc::now().into()),
                ..Default::default()
            };
            new_user.insert(&state.db).await?
        }
    };

    let token = create_token(
        user.id,
        user.role.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    // Respond with the stored email, same as profile reads.
    let email = state.crypto.decrypt(&user.email_encrypted)?;
    Ok(Json(AuthResponse {
        token,
        user: ProfileResponse::from_user(user, email),
    }))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email_hash = hash_email(&payload.email);

    let user = user::Entity::find()
        .filter(user::Column::EmailHash.eq(&email_hash))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    // Placeholder accounts created from a booking have no password yet.
    let stored_hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = create_token(
        user.id,
        user.role.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    let email = state.crypto.decrypt(&user.email_encrypted)?;
    Ok(Json(AuthResponse {
        token,
        user: ProfileResponse::from_user(user, email),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("  a@x.com ").is_ok());
        assert!(validate_email("ax.com").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@xcom").is_err());
    }
}

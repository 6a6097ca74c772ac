use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::user::{self, RoleDetails, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::crypto::hash_email;
use crate::utils::jwt::Claims;
use crate::AppState;

/// Profile as returned to clients: decrypted email, no password hash and no
/// lookup hash.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub contact_number: Option<String>,
    pub role: UserRole,
    pub details: Option<RoleDetails>,
}

impl ProfileResponse {
    pub fn from_user(user: user::Model, email: String) -> Self {
        Self {
            id: user.id,
            email,
            name: user.name,
            age: user.age,
            contact_number: user.contact_number,
            role: user.role,
            details: user.details,
        }
    }
}

/// Get a user profile by id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ProfileResponse>> {
    let user = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let email = state.crypto.decrypt(&user.email_encrypted)?;
    Ok(Json(ProfileResponse::from_user(user, email)))
}

#[derive(Debug, Deserialize)]
pub struct SaveDetailsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub contact_number: Option<String>,
    pub role: Option<UserRole>,
    pub details: Option<RoleDetails>,
}

/// Merge-update the authenticated user's profile. Absent fields are left
/// untouched; role details are replaced wholesale and must match the active
/// role.
pub async fn save_details(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveDetailsRequest>,
) -> AppResult<Json<Value>> {
    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let active_role = payload.role.clone().unwrap_or_else(|| user.role.clone());

    if let Some(details) = &payload.details {
        if !details.matches_role(&active_role) {
            return Err(AppError::BadRequest(
                "Profile details do not match the selected role".to_string(),
            ));
        }
    }

    let mut active: user::ActiveModel = user.clone().into();

    if let Some(email) = &payload.email {
        let new_hash = hash_email(email);
        if new_hash != user.email_hash {
            let taken = user::Entity::find()
                .filter(user::Column::EmailHash.eq(&new_hash))
                .one(&state.db)
                .await?;
            if taken.is_some() {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
            active.email_encrypted = Set(state.crypto.encrypt(email.trim())?);
            active.email_hash = Set(new_hash);
        }
    }

    if let Some(password) = &payload.password {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();
        active.password_hash = Set(Some(password_hash));
    }

    if let Some(name) = payload.name {
        active.name = Set(Some(name));
    }
    if let Some(age) = payload.age {
        active.age = Set(Some(age));
    }
    if let Some(contact_number) = payload.contact_number {
        active.contact_number = Set(Some(contact_number));
    }
    if let Some(role) = payload.role {
        active.role = Set(role);
    }
    if let Some(details) = payload.details {
        // The rating fields belong to the feedback path; a profile update
        // must not reset them.
        let details = match (details, &user.details) {
            (
                RoleDetails::Provider {
                    service_type,
                    years_experience,
                    hourly_rate,
                    ..
                },
                Some(RoleDetails::Provider {
                    average_rating,
                    rating_count,
                    ..
                }),
            ) => RoleDetails::Provider {
                service_type,
                years_experience,
                hourly_rate,
                average_rating: *average_rating,
                rating_count: *rating_count,
            },
            (details, _) => details,
        };
        active.details = Set(Some(details));
    }

    active.update(&state.db).await?;

    Ok(Json(json!({ "message": "User details saved successfully" })))
}

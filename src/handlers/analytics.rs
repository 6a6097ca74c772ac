use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::user_activity::{self, ActivityType};
use crate::entities::{service, user};
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub user_id: Uuid,
    pub activity_type: ActivityType,
    pub service_id: Option<Uuid>,
    pub search_query: Option<String>,
}

/// Record a user activity event. If a service is referenced, its interest
/// label (first word of the title) is stored alongside.
pub async fn track(
    State(state): State<AppState>,
    Json(payload): Json<TrackRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user = user::Entity::find_by_id(payload.user_id)
        .one(&state.db)
        .await?;
    if user.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let service_type = match payload.service_id {
        Some(service_id) => service::Entity::find_by_id(service_id)
            .one(&state.db)
            .await?
            .and_then(|s| s.type_label()),
        None => None,
    };

    let activity = user_activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(payload.user_id),
        activity_type: Set(payload.activity_type),
        service_id: Set(payload.service_id),
        service_type: Set(service_type),
        search_query: Set(payload.search_query),
        created_at: Set(Utc::now().into()),
    };

    activity.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

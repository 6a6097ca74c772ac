use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::service;
use crate::entities::user::{self, RoleDetails, UserRole};
use crate::error::{AppError, AppResult};
use crate::handlers::services::ServiceSummary;
use crate::utils::crypto::hash_email;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub service_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub booking_date: DateTime<Utc>,
    pub contact_number: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub service: ServiceSummary,
    pub user_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub booking_date: DateTime<Utc>,
    pub contact_number: Option<String>,
    pub special_instructions: Option<String>,
    pub status: BookingStatus,
    pub feedback_rating: Option<i16>,
    pub feedback_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingResponse {
    fn new(booking: booking::Model, service: &service::Model) -> Self {
        Self {
            id: booking.id,
            service: service.into(),
            user_id: booking.user_id,
            client_name: booking.client_name,
            client_email: booking.client_email,
            booking_date: booking.booking_date.with_timezone(&Utc),
            contact_number: booking.contact_number,
            special_instructions: booking.special_instructions,
            status: booking.status,
            feedback_rating: booking.feedback_rating,
            feedback_comment: booking.feedback_comment,
            created_at: booking.created_at.with_timezone(&Utc),
        }
    }
}

/// Create a booking against an existing service. The requester is resolved
/// by email hash, or a placeholder consumer account is created, and the
/// booking is inserted in the same transaction.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    if payload.client_name.trim().is_empty() || payload.client_email.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Client name and email are required".to_string(),
        ));
    }

    let service = service::Entity::find_by_id(payload.service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Service not found".to_string()))?;

    let email_hash = hash_email(&payload.client_email);

    let txn = state.db.begin().await?;

    let requester = user::Entity::find()
        .filter(user::Column::EmailHash.eq(&email_hash))
        .one(&txn)
        .await?;

    let user_id = match requester {
        Some(found) => found.id,
        None => {
            // Placeholder account; it can log in only after registering.
            let placeholder = user::ActiveModel {
                id: Set(Uuid::new_v4()),
                email_encrypted: Set(state.crypto.encrypt(payload.client_email.trim())?),
                email_hash: Set(email_hash),
                name: Set(Some(payload.client_name.trim().to_string())),
                role: Set(UserRole::Consumer),
                created_at: Set(Utc::now().into()),
                ..Default::default()
            };
            placeholder.insert(&txn).await?.id
        }
    };

    let now = Utc::now();
    let new_booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        service_id: Set(service.id),
        user_id: Set(user_id),
        client_name: Set(payload.client_name.trim().to_string()),
        client_email: Set(payload.client_email.trim().to_string()),
        booking_date: Set(payload.booking_date.into()),
        contact_number: Set(payload.contact_number),
        special_instructions: Set(payload.special_instructions),
        status: Set(BookingStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    let booking = new_booking.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(booking_id = %booking.id, service_id = %service.id, "booking created");

    Ok(Json(BookingResponse::new(booking, &service)))
}

/// All bookings referencing a service, newest requested date first
pub async fn list_for_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let service = service::Entity::find_by_id(service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Service not found".to_string()))?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::ServiceId.eq(service_id))
        .order_by_desc(booking::Column::BookingDate)
        .all(&state.db)
        .await?;

    let responses = bookings
        .into_iter()
        .map(|b| BookingResponse::new(b, &service))
        .collect();

    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub client_email: Option<String>,
}

/// Booking history for the caller (or an explicit client email). Runs the
/// stale-booking sweep first so expired pending bookings show up cancelled.
pub async fn booking_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    expire_stale_pending(&state.db).await?;

    let mut condition = Condition::any();
    match &query.client_email {
        Some(email) => {
            condition = condition.add(booking::Column::ClientEmail.eq(email.trim()));
            let resolved = user::Entity::find()
                .filter(user::Column::EmailHash.eq(hash_email(email)))
                .one(&state.db)
                .await?;
            if let Some(found) = resolved {
                condition = condition.add(booking::Column::UserId.eq(found.id));
            }
        }
        None => {
            condition = condition.add(booking::Column::UserId.eq(claims.sub));
        }
    }

    let bookings = booking::Entity::find()
        .filter(condition)
        .order_by_desc(booking::Column::BookingDate)
        .all(&state.db)
        .await?;

    to_responses(&state.db, bookings).await.map(Json)
}

/// All bookings made by a user, newest requested date first
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(user_id))
        .order_by_desc(booking::Column::BookingDate)
        .all(&state.db)
        .await?;

    to_responses(&state.db, bookings).await.map(Json)
}

/// Booking details, visible to its consumer and the service provider
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let service = service::Entity::find_by_id(booking.service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Service not found for booking".to_string()))?;

    if booking.user_id != claims.sub && service.created_by != Some(claims.sub) {
        return Err(AppError::Forbidden(
            "You don't have permission to view this booking".to_string(),
        ));
    }

    Ok(Json(BookingResponse::new(booking, &service)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

/// Apply a status transition. The service provider may apply any legal
/// transition; the booking's consumer may only cancel.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    transition(&state, &claims, booking_id, payload.status).await
}

/// Cancel a booking (consumer shortcut for update-status)
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    transition(&state, &claims, booking_id, BookingStatus::Cancelled).await
}

/// Decide what a requested transition means for the stored status: an error
/// if illegal, `None` if it repeats the current status (a no-op), or the
/// status to write.
fn plan_transition(
    current: BookingStatus,
    requested: BookingStatus,
) -> AppResult<Option<BookingStatus>> {
    if !current.can_transition_to(requested) {
        return Err(AppError::InvalidTransition {
            from: current.to_string(),
            to: requested.to_string(),
        });
    }
    if current == requested {
        Ok(None)
    } else {
        Ok(Some(requested))
    }
}

async fn transition(
    state: &AppState,
    claims: &Claims,
    booking_id: Uuid,
    new_status: BookingStatus,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let service = service::Entity::find_by_id(booking.service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Service not found for booking".to_string()))?;

    let is_provider = service.created_by == Some(claims.sub);
    let is_consumer = booking.user_id == claims.sub;

    if !is_provider && !is_consumer {
        return Err(AppError::Forbidden(
            "You don't have permission to update this booking".to_string(),
        ));
    }
    if !is_provider && new_status != BookingStatus::Cancelled {
        return Err(AppError::Forbidden(
            "Consumers can only cancel bookings".to_string(),
        ));
    }

    let Some(next) = plan_transition(booking.status, new_status)? else {
        return Ok(Json(BookingResponse::new(booking, &service)));
    };

    // Conditional write: the status we validated against must still be the
    // stored one, otherwise a concurrent transition won this booking.
    let now = Utc::now();
    let result = booking::Entity::update_many()
        .col_expr(booking::Column::Status, next.as_enum())
        .col_expr(booking::Column::UpdatedAt, Expr::value(now))
        .filter(booking::Column::Id.eq(booking.id))
        .filter(booking::Column::Status.eq(booking.status))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Booking was updated concurrently; fetch it and retry".to_string(),
        ));
    }

    let updated = booking::Model {
        status: next,
        updated_at: now.into(),
        ..booking
    };

    tracing::info!(booking_id = %updated.id, status = %updated.status, "booking status updated");

    Ok(Json(BookingResponse::new(updated, &service)))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i16,
    pub comment: Option<String>,
}

/// Attach a rating to a completed booking (consumer only)
pub async fn add_feedback(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<FeedbackRequest>,
) -> AppResult<Json<Value>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "Rating must be an integer between 1 and 5".to_string(),
        ));
    }

    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.user_id != claims.sub {
        return Err(AppError::Forbidden(
            "Only the consumer can leave feedback".to_string(),
        ));
    }
    if booking.status != BookingStatus::Completed {
        return Err(AppError::BadRequest(
            "Feedback can only be provided for completed bookings".to_string(),
        ));
    }

    let service = service::Entity::find_by_id(booking.service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Service not found for booking".to_string()))?;

    let mut active: booking::ActiveModel = booking.into();
    active.feedback_rating = Set(Some(payload.rating));
    active.feedback_comment = Set(payload.comment);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.db).await?;

    if let Some(provider_id) = service.created_by {
        update_provider_rating(&state.db, provider_id).await?;
    }

    Ok(Json(json!({ "message": "Feedback added successfully" })))
}

/// All bookings across every service the caller provides, newest first
pub async fn provider_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let services = service::Entity::find()
        .filter(service::Column::CreatedBy.eq(claims.sub))
        .all(&state.db)
        .await?;

    if services.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let service_ids: Vec<Uuid> = services.iter().map(|s| s.id).collect();

    let bookings = booking::Entity::find()
        .filter(booking::Column::ServiceId.is_in(service_ids))
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let responses = bookings
        .into_iter()
        .filter_map(|b| {
            let service = services.iter().find(|s| s.id == b.service_id)?;
            Some(BookingResponse::new(b, service))
        })
        .collect();

    Ok(Json(responses))
}

/// Average a set of 1..=5 ratings to one decimal place
fn aggregate_rating(ratings: &[i16]) -> Option<(Decimal, i64)> {
    if ratings.is_empty() {
        return None;
    }
    let count = ratings.len() as i64;
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let average = (Decimal::from(sum) / Decimal::from(count)).round_dp(1);
    Some((average, count))
}

/// Recompute a provider's average rating from the feedback on completed
/// bookings across all their services, and store it in the profile details.
async fn update_provider_rating(db: &DatabaseConnection, provider_id: Uuid) -> AppResult<()> {
    let provider = user::Entity::find_by_id(provider_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))?;

    let Some(RoleDetails::Provider {
        service_type,
        years_experience,
        hourly_rate,
        ..
    }) = provider.details.clone()
    else {
        // Nothing to aggregate into until the provider fills in details.
        return Ok(());
    };

    let service_ids: Vec<Uuid> = service::Entity::find()
        .filter(service::Column::CreatedBy.eq(provider_id))
        .all(db)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();

    let ratings: Vec<i16> = booking::Entity::find()
        .filter(booking::Column::ServiceId.is_in(service_ids))
        .filter(booking::Column::Status.eq(BookingStatus::Completed))
        .filter(booking::Column::FeedbackRating.is_not_null())
        .all(db)
        .await?
        .into_iter()
        .filter_map(|b| b.feedback_rating)
        .collect();

    let (average_rating, rating_count) = match aggregate_rating(&ratings) {
        Some((average, count)) => (Some(average), Some(count)),
        None => (None, None),
    };

    let mut active: user::ActiveModel = provider.into();
    active.details = Set(Some(RoleDetails::Provider {
        service_type,
        years_experience,
        hourly_rate,
        average_rating,
        rating_count,
    }));
    active.update(db).await?;

    Ok(())
}

/// Trigger the stale-booking sweep explicitly
pub async fn auto_expire(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let expired = expire_stale_pending(&state.db).await?;
    Ok(Json(json!({
        "message": format!("Cancelled {} stale bookings", expired),
        "updated": expired,
    })))
}

/// Cancel pending bookings whose requested date has passed. The transition
/// is persisted, not just relabelled for display.
pub async fn expire_stale_pending(db: &DatabaseConnection) -> AppResult<u64> {
    let now = Utc::now();

    // One guarded update; the status filter keeps concurrent sweeps and
    // explicit transitions from double-writing a booking.
    let result = booking::Entity::update_many()
        .col_expr(booking::Column::Status, BookingStatus::Cancelled.as_enum())
        .col_expr(booking::Column::UpdatedAt, Expr::value(now))
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .filter(booking::Column::BookingDate.lt(now))
        .exec(db)
        .await?;

    let expired = result.rows_affected;
    if expired > 0 {
        tracing::info!(count = expired, "auto-expired stale pending bookings");
    }

    Ok(expired)
}

async fn to_responses(
    db: &DatabaseConnection,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<BookingResponse>> {
    let services = service::Entity::find().all(db).await?;

    let responses = bookings
        .into_iter()
        .filter_map(|b| {
            let service = services.iter().find(|s| s.id == b.service_id)?;
            Some(BookingResponse::new(b, service))
        })
        .collect();

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_allows_legal_moves() {
        assert_eq!(
            plan_transition(BookingStatus::Pending, BookingStatus::Confirmed).unwrap(),
            Some(BookingStatus::Confirmed)
        );
        assert_eq!(
            plan_transition(BookingStatus::InProgress, BookingStatus::Completed).unwrap(),
            Some(BookingStatus::Completed)
        );
    }

    #[test]
    fn plan_treats_repeat_as_noop() {
        assert_eq!(
            plan_transition(BookingStatus::Cancelled, BookingStatus::Cancelled).unwrap(),
            None
        );
        assert_eq!(
            plan_transition(BookingStatus::Pending, BookingStatus::Pending).unwrap(),
            None
        );
    }

    #[test]
    fn plan_rejects_illegal_moves() {
        assert!(matches!(
            plan_transition(BookingStatus::Cancelled, BookingStatus::Confirmed),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(matches!(
            plan_transition(BookingStatus::InProgress, BookingStatus::Cancelled),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn rating_aggregation_rounds_to_one_decimal() {
        assert_eq!(aggregate_rating(&[]), None);
        assert_eq!(aggregate_rating(&[4, 5]), Some((Decimal::new(45, 1), 2)));
        // 13 / 3 = 4.333… rounds to 4.3
        assert_eq!(aggregate_rating(&[5, 4, 4]), Some((Decimal::new(43, 1), 3)));
    }
}

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::service;
use crate::error::{AppError, AppResult};
use crate::utils::geo::is_within_radius;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub provider_name: String,
    pub provider_contact: String,
    pub provider_email: String,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub provider_name: Option<String>,
    pub provider_contact: Option<String>,
    pub provider_email: Option<String>,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
}

/// Create a new service listing (provider only)
pub async fn create_service(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateServiceRequest>,
) -> AppResult<Json<service::Model>> {
    let required = [
        ("title", &payload.title),
        ("description", &payload.description),
        ("provider_name", &payload.provider_name),
        ("provider_contact", &payload.provider_contact),
        ("provider_email", &payload.provider_email),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{} is required", field)));
        }
    }
    if payload.price <= Decimal::ZERO {
        return Err(AppError::BadRequest("price must be positive".to_string()));
    }
    let (lng, lat) = location_pair(payload.lng, payload.lat)?;

    let new_service = service::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        description: Set(payload.description),
        price: Set(payload.price),
        provider_name: Set(payload.provider_name),
        provider_contact: Set(payload.provider_contact),
        provider_email: Set(payload.provider_email),
        lng: Set(lng),
        lat: Set(lat),
        created_by: Set(Some(claims.sub)),
        created_at: Set(Utc::now().into()),
    };

    let service = new_service.insert(&state.db).await?;
    Ok(Json(service))
}

/// Merge partial fields into an existing service (creator only)
pub async fn update_service(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(service_id): Path<Uuid>,
    Json(payload): Json<UpdateServiceRequest>,
) -> AppResult<Json<service::Model>> {
    let service = service::Entity::find_by_id(service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Service not found".to_string()))?;

    if service.created_by != Some(claims.sub) {
        return Err(AppError::Forbidden(
            "You can only update your own services".to_string(),
        ));
    }

    // Merge the location before validating, so a partial update cannot leave
    // one coordinate behind.
    let (lng, lat) = location_pair(payload.lng.or(service.lng), payload.lat.or(service.lat))?;

    let mut active: service::ActiveModel = service.into();

    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        if price <= Decimal::ZERO {
            return Err(AppError::BadRequest("price must be positive".to_string()));
        }
        active.price = Set(price);
    }
    if let Some(provider_name) = payload.provider_name {
        active.provider_name = Set(provider_name);
    }
    if let Some(provider_contact) = payload.provider_contact {
        active.provider_contact = Set(provider_contact);
    }
    if let Some(provider_email) = payload.provider_email {
        active.provider_email = Set(provider_email);
    }
    active.lng = Set(lng);
    active.lat = Set(lat);

    let updated = active.update(&state.db).await?;
    Ok(Json(updated))
}

/// A location is both coordinates or neither
fn location_pair(lng: Option<f64>, lat: Option<f64>) -> AppResult<(Option<f64>, Option<f64>)> {
    if lng.is_some() != lat.is_some() {
        return Err(AppError::BadRequest(
            "Both lng and lat must be provided for a location".to_string(),
        ));
    }
    Ok((lng, lat))
}

/// List every service (no pagination)
pub async fn list_all(State(state): State<AppState>) -> AppResult<Json<Vec<service::Model>>> {
    let services = service::Entity::find().all(&state.db).await?;
    Ok(Json(services))
}

/// Get service details by id
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> AppResult<Json<service::Model>> {
    let service = service::Entity::find_by_id(service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Service not found".to_string()))?;
    Ok(Json(service))
}

/// Case-insensitive title substring search
pub async fn find_by_title(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> AppResult<Json<Vec<service::Model>>> {
    let needle = title.to_lowercase();
    let services = service::Entity::find().all(&state.db).await?;

    let matches: Vec<service::Model> = services
        .into_iter()
        .filter(|s| s.title.to_lowercase().contains(&needle))
        .collect();

    Ok(Json(matches))
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

/// Services within a radius (km) of a point. Services without coordinates
/// are never returned.
pub async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> AppResult<Json<Vec<service::Model>>> {
    let (lat, lng) = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(AppError::BadRequest(
                "Latitude and longitude are required".to_string(),
            ))
        }
    };
    let radius_km = query.radius.unwrap_or(5.0);

    let services = service::Entity::find().all(&state.db).await?;

    let nearby: Vec<service::Model> = services
        .into_iter()
        .filter(|s| match (s.lat, s.lng) {
            (Some(s_lat), Some(s_lng)) => is_within_radius(s_lat, s_lng, lat, lng, radius_km),
            _ => false,
        })
        .collect();

    Ok(Json(nearby))
}

#[derive(Debug, Serialize)]
pub struct ServiceSummary {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
}

impl From<&service::Model> for ServiceSummary {
    fn from(service: &service::Model) -> Self {
        Self {
            id: service.id,
            title: service.title.clone(),
            price: service.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_requires_both_or_neither() {
        assert_eq!(location_pair(None, None).unwrap(), (None, None));
        assert_eq!(
            location_pair(Some(-0.12), Some(51.5)).unwrap(),
            (Some(-0.12), Some(51.5))
        );
        assert!(location_pair(Some(-0.12), None).is_err());
        assert!(location_pair(None, Some(51.5)).is_err());
    }

    #[test]
    fn partial_update_keeps_location_complete() {
        // Stored lat fills in when only lng is sent.
        let (lng, lat) = location_pair(Some(-0.14).or(Some(-0.12)), None.or(Some(51.5))).unwrap();
        assert_eq!((lng, lat), (Some(-0.14), Some(51.5)));

        // A lone new coordinate against a service with no location is rejected.
        assert!(location_pair(Some(-0.14).or(None), None.or(None)).is_err());
    }
}

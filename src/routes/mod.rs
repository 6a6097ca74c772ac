use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{analytics, auth, bookings, recommendations, services, users};
use crate::middleware::auth::{auth_middleware, require_provider};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Account routes: register/login public, profile lookup authenticated
    let user_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/{id}", get(users::get_profile))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let user_details_routes = Router::new()
        .route("/save-details", post(users::save_details))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Catalog reads are public; create/update require a provider account
    let service_routes = Router::new()
        .route("/all", get(services::list_all))
        .route("/service/{id}", get(services::get_by_id))
        .route("/service/title/{title}", get(services::find_by_title))
        .route("/nearby", get(services::nearby))
        .merge(
            Router::new()
                .route("/create", post(services::create_service))
                .route("/update/{id}", put(services::update_service))
                .layer(middleware::from_fn(require_provider))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    // The whole booking lifecycle requires authentication
    let booking_routes = Router::new()
        .route("/create", post(bookings::create_booking))
        .route("/service/{service_id}", get(bookings::list_for_service))
        .route("/history", get(bookings::booking_history))
        .route("/provider-history", get(bookings::provider_history))
        .route("/user/{user_id}", get(bookings::list_for_user))
        .route("/booking/{id}", get(bookings::get_booking))
        .route("/update-status/{id}", put(bookings::update_status))
        .route("/{id}/cancel", put(bookings::cancel_booking))
        .route("/auto-expire", put(bookings::auto_expire))
        .route("/feedback/{id}", post(bookings::add_feedback))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Activity tracking and recommendations validate the user themselves
    let analytics_routes = Router::new().route("/track", post(analytics::track));
    let recommendation_routes = Router::new().route("/{user_id}", get(recommendations::recommend));

    Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/user-details", user_details_routes)
        .nest("/api/services", service_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/analytics", analytics_routes)
        .nest("/api/recommendations", recommendation_routes)
        .with_state(state)
}

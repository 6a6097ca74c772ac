pub mod analytics;
pub mod auth;
pub mod bookings;
pub mod recommendations;
pub mod services;
pub mod users;

pub mod booking;
pub mod service;
pub mod user;
pub mod user_activity;

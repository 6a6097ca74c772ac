pub mod crypto;
pub mod geo;
pub mod jwt;

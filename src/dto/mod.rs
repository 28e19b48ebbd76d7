pub mod auth;
pub mod products;

//! Domain logic and persistence for the wishlist backend. Every domain module exposes plain
//! async functions taking an injected store, so the same logic runs against PostgreSQL and
//! against the in-memory store.

pub mod auth;
pub mod database;
pub mod money;
pub mod offer;
pub mod user;
pub mod validation;
pub mod wish;

pub use money::Cents;
pub use validation::ValidationError;

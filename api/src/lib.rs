//! This library contains definitions for the API layer.

use app::database::Repository;
use rocket::{Build, Rocket};
use state::RocketState;
use std::sync::Arc;

mod access;
mod error;
mod rate_limit;
mod routes;
mod state;

pub use rate_limit::RateLimit;

pub fn register(
    rocket: Rocket<Build>,
    repository: Arc<dyn Repository>,
    rate_limit: RateLimit,
) -> Rocket<Build> {
    routes::register(
        rocket,
        RocketState {
            repository,
            rate_limit,
        },
    )
}

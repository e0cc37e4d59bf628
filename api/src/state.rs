use app::database::Repository;
use std::sync::Arc;

use crate::rate_limit::RateLimit;

pub struct RocketState {
    pub repository: Arc<dyn Repository>,
    pub rate_limit: RateLimit,
}

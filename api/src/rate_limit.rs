use std::sync::Arc;

use app::user;
use dashmap::{mapref::entry::Entry, DashMap};
use std::time::Duration;

/// Allows each user at most `limit` authenticated requests within any `span`.
pub struct RateLimit {
    limit: usize,
    span: Duration,
    counter: Arc<DashMap<user::Id, usize>>,
}

impl RateLimit {
    pub fn new(limit: usize, span: Duration) -> Self {
        Self {
            limit,
            span,
            counter: Arc::new(Default::default()),
        }
    }

    /// Returns true if the user should be rate limited, false otherwise. Every request that is
    /// let through is forgotten again after `span`.
    pub fn limit(&self, user_id: user::Id) -> bool {
        let mut count = self.counter.entry(user_id).or_insert(0);
        if *count >= self.limit {
            return true;
        }
        *count += 1;
        drop(count);
        self.decrement_later(user_id);
        false
    }

    fn decrement_later(&self, user_id: user::Id) {
        let counter = Arc::clone(&self.counter);
        let span = self.span;
        tokio::spawn(async move {
            tokio::time::sleep(span).await;
            match counter.entry(user_id) {
                Entry::Occupied(mut e) => {
                    let v = e.get_mut();
                    *v = v.saturating_sub(1);
                    if *v == 0 {
                        e.remove();
                    }
                }
                Entry::Vacant(_) => {
                    log::error!(
                        "entry should not be vacant, this is a bug. user id {:?}",
                        user_id
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn limits_within_span_and_recovers_after() {
        let rate_limit = RateLimit::new(2, Duration::from_secs(10));
        let alice = user::Id(1);
        let bob = user::Id(2);

        assert!(!rate_limit.limit(alice));
        assert!(!rate_limit.limit(alice));
        assert!(rate_limit.limit(alice));
        assert!(!rate_limit.limit(bob));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(!rate_limit.limit(alice));
    }
}

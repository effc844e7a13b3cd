//! Activity publisher.
//!
//! Activities collected during a ledger operation are handed to the
//! publisher only after the owning database transaction has committed.
//! Insertion into the outbox runs on a detached tokio task: a dispatch
//! failure is logged and never affects the already-committed ledger
//! change.

use domain::models::Activity;
use persistence::repositories::ActivityRepository;
use sqlx::PgPool;
use tracing::{debug, error};

/// Publishes activity records to the outbox, post-commit.
#[derive(Clone)]
pub struct ActivityPublisher {
    repo: ActivityRepository,
}

impl ActivityPublisher {
    /// Create a new publisher over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { repo: ActivityRepository::new(pool) }
    }

    /// Fire-and-forget publication of a batch of activities.
    pub fn publish(&self, activities: Vec<Activity>) {
        if activities.is_empty() {
            return;
        }

        let repo = self.repo.clone();
        tokio::spawn(async move {
            let count = activities.len();
            match repo.insert_many(&activities).await {
                Ok(()) => debug!(count, "Stored activity records"),
                Err(err) => error!(count, "Failed to store activity records: {err}"),
            }
        });
    }

    /// Publish a batch and wait for the insert. Used by task handlers and
    /// scheduled jobs, which are already asynchronous to the request path.
    pub async fn publish_and_wait(&self, activities: Vec<Activity>) {
        if activities.is_empty() {
            return;
        }
        if let Err(err) = self.repo.insert_many(&activities).await {
            error!(count = activities.len(), "Failed to store activity records: {err}");
        }
    }
}

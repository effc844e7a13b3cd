//! Orchestration services over the ledger store.

pub mod account;
pub mod activity;
pub mod callback;
pub mod campaign;
pub mod email;
pub mod reward_issuance;
pub mod transaction;

pub use account::AccountService;
pub use activity::ActivityPublisher;
pub use callback::EnrolmentCallbackService;
pub use campaign::CampaignService;
pub use email::EmailService;
pub use reward_issuance::RewardIssuanceService;
pub use transaction::{TransactionOutcome, TransactionService};

/// Failure of a task handler, classified for the task runner.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The handler may succeed on a later attempt.
    #[error("{0}")]
    Retryable(String),
    /// Retrying cannot help; the task is marked failed immediately.
    #[error("{0}")]
    Permanent(String),
}

impl TaskError {
    /// Shorthand for a retryable database failure.
    pub fn from_db(err: sqlx::Error) -> Self {
        TaskError::Retryable(format!("database error: {err}"))
    }
}

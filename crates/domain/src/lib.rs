//! Domain layer for Loyalty Engine backend.
//!
//! This crate contains:
//! - Domain models (retailers, account holders, campaigns, balances, rewards)
//! - Pure business logic services (earn computation, ledger arithmetic,
//!   campaign lifecycle rules, activity payload builders)
//! - The domain error taxonomy

pub mod error;
pub mod models;
pub mod services;

pub use error::ServiceError;

//! Persistence layer for Loyalty Engine backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//!
//! Repository methods that must participate in a caller-owned database
//! transaction take `&mut Transaction<'_, Postgres>`; pool-scoped methods
//! take `&self` and use the repository's own pool.

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

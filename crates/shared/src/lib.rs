//! Shared utilities and common types for Loyalty Engine backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (API key hashing)
//! - Account number generation
//! - Currency and stamp value formatting
//! - Common validation logic

pub mod account_number;
pub mod crypto;
pub mod currency;
pub mod validation;

//! Domain models for Gullin.
//!
//! These are the core types shared across all crates.

pub mod account;
pub mod activity;
pub mod identity;
pub mod investor;
pub mod verification_code;

//! Gullin Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `gullin-core` traits, bundled
//!   as a [`SurrealStore`]
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;
mod store;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
pub use store::SurrealStore;

//! Gullin Core: domain models, error taxonomy, repository traits, and
//! the contracts of the external collaborators (notification gateway,
//! session challenge store, identity verification provider).

pub mod challenge;
pub mod error;
pub mod models;
pub mod notification;
pub mod provider;
pub mod repository;

pub use error::{GullinError, GullinResult};

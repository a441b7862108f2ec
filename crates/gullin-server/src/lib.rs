//! Gullin Server: configuration, notification gateway and service
//! wiring for the process entry point.

pub mod app;
pub mod config;
pub mod gateway;

pub use app::App;
pub use config::{ConfigError, ServerConfig};
pub use gateway::TracingGateway;

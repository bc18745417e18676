//! HTTP API.
pub mod metrics;
pub mod status;
pub mod users;

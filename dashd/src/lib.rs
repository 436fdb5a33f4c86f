//! HTTP JSON backend of the Redis inspection dashboard

// Re-export modules for use in integration tests
pub mod api;
pub mod inspect;
pub mod keyinfo;
pub mod metrics;
pub mod seed;
pub mod server;
pub mod store;

pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod query_filter;
pub mod telemetry;

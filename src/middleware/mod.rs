//! Middleware module
//!
//! actix-web integration for access-token authentication.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;

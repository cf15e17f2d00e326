//! Authentication module
//!
//! Handles signing and verification of access/refresh JWTs, bearer header
//! parsing, and the refresh exchange.

mod bearer;
mod claims;
mod clock;
mod jwt;
mod refresh_token;

/// Conventional cookie names for transports that carry tokens in cookies.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

pub use bearer::{parse_bearer, BEARER_PREFIX};
pub use claims::{Claims, IdentityPayload, RoleAssignment};
pub use clock::{Clock, FixedClock, SystemClock};
pub use jwt::{sign_token, verify_token, SigningAlgorithm};
pub use refresh_token::{TokenPair, TokenService};

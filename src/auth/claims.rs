//! JWT Claims structure
//!
//! The identity payload embedded in every token, plus the registered
//! temporal claims (RFC 7519) that wrap it.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// One role held by the subject, scoped to an organisational unit and resource
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role_id: i64,
    pub org_unit_code: String,
    pub resource_id: i64,
}

/// Application identity carried inside access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IdentityPayload {
    pub subject_id: i64,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

impl IdentityPayload {
    pub fn new(subject_id: i64, roles: Vec<RoleAssignment>) -> Self {
        Self { subject_id, roles }
    }

    pub fn has_role(&self, role_id: i64) -> bool {
        self.roles.iter().any(|role| role.role_id == role_id)
    }
}

/// Signed claim set. Custom data is nested under `payload` so it can never
/// shadow `exp`/`iat`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub payload: IdentityPayload,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    /// Wrap a payload for signing.
    pub fn encode(payload: &IdentityPayload, issued_at: i64, expires_at: i64) -> Self {
        Self {
            payload: payload.clone(),
            exp: expires_at,
            iat: Some(issued_at),
        }
    }

    /// Recover the payload from a verified claim set.
    ///
    /// # Errors
    /// `MalformedToken` if `exp` was never set
    pub fn decode(self) -> Result<IdentityPayload, AuthError> {
        if self.exp <= 0 {
            return Err(AuthError::MalformedToken);
        }
        Ok(self.payload)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp < now
    }
}

//! Token Pair Issuance and Refresh
//!
//! `TokenService` owns the signing settings and the clock, and is the single
//! entry point for minting pairs, validating access tokens, and exchanging a
//! refresh token for a new pair.
//!
//! Refresh tokens are stateless. A refresh token that has been exchanged is
//! not revoked and stays valid until its own `exp`; there is no server-side
//! store to record consumption.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::bearer::parse_bearer;
use crate::auth::claims::IdentityPayload;
use crate::auth::clock::{Clock, SystemClock};
use crate::auth::jwt::{sign_token, verify_token, SigningAlgorithm};
use crate::configuration::JwtSettings;
use crate::error::AuthError;

/// Access and refresh token, always issued together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    settings: JwtSettings,
    algorithm: SigningAlgorithm,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Service backed by the system clock.
    pub fn new(settings: JwtSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: JwtSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            algorithm: SigningAlgorithm::Hs256,
            clock,
        }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    /// Mint a fresh access/refresh pair for `payload`.
    ///
    /// # Errors
    /// `SigningError` if either token cannot be signed; no partial pair is
    /// returned
    pub fn issue_pair(&self, payload: &IdentityPayload) -> Result<TokenPair, AuthError> {
        let access_token = sign_token(
            payload,
            self.settings.access_secret.as_bytes(),
            self.settings.access_horizon(),
            self.algorithm,
            self.clock.as_ref(),
        )?;
        let refresh_token = sign_token(
            payload,
            self.settings.refresh_secret.as_bytes(),
            self.settings.refresh_horizon(),
            self.algorithm,
            self.clock.as_ref(),
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token against the access secret.
    pub fn validate_access_token(&self, token: &str) -> Result<IdentityPayload, AuthError> {
        verify_token(
            token,
            self.settings.access_secret.as_bytes(),
            self.algorithm,
            self.clock.as_ref(),
        )
    }

    /// Extract the token from an authorization header value and verify it.
    ///
    /// # Errors
    /// `MalformedToken` when the header carries no token
    pub fn validate_bearer(&self, header_value: &str) -> Result<IdentityPayload, AuthError> {
        let token = parse_bearer(header_value);
        if token.is_empty() {
            return Err(AuthError::MalformedToken);
        }
        self.validate_access_token(token)
    }

    /// Exchange a refresh token for a brand-new pair carrying the same payload.
    ///
    /// # Errors
    /// Any verification failure of the presented token, unchanged; nothing is
    /// issued in that case
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let payload = verify_token(
            refresh_token,
            self.settings.refresh_secret.as_bytes(),
            self.algorithm,
            self.clock.as_ref(),
        )
        .map_err(|e| {
            tracing::warn!(kind = e.kind(), "Refresh token rejected");
            e
        })?;

        let pair = self.issue_pair(&payload)?;
        tracing::info!(subject_id = payload.subject_id, "Token pair reissued");
        Ok(pair)
    }
}

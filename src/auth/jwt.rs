//! JWT Token Generation and Validation
//!
//! Compact HS256 tokens: `base64url(header).base64url(claims).base64url(hmac)`.
//! The declared algorithm is checked against a closed set before any key is
//! built, and expiry is checked against the same `Clock` used for signing.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use crate::auth::claims::{Claims, IdentityPayload};
use crate::auth::clock::Clock;
use crate::error::AuthError;

/// Algorithms this crate will sign with or accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    Hs256,
}

impl SigningAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            SigningAlgorithm::Hs256 => "HS256",
        }
    }

    /// Match a header `alg` value by exact name.
    pub fn from_header(alg: &str) -> Option<Self> {
        match alg {
            "HS256" => Some(SigningAlgorithm::Hs256),
            _ => None,
        }
    }

    fn jwt_algorithm(self) -> Algorithm {
        match self {
            SigningAlgorithm::Hs256 => Algorithm::HS256,
        }
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Sign a payload into a compact token expiring `horizon` from now.
///
/// # Errors
/// `SigningError` if the claim set cannot be serialized
pub fn sign_token(
    payload: &IdentityPayload,
    secret: &[u8],
    horizon: Duration,
    algorithm: SigningAlgorithm,
    clock: &dyn Clock,
) -> Result<String, AuthError> {
    let now = clock.now();
    let horizon = i64::try_from(horizon.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims::encode(payload, now, now.saturating_add(horizon));

    encode(
        &Header::new(algorithm.jwt_algorithm()),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::SigningError(e.to_string()))
}

/// Verify a compact token and return the embedded payload.
///
/// Checks run in order: structure, declared algorithm, signature, claims,
/// expiry. The first failure is returned.
pub fn verify_token(
    token: &str,
    secret: &[u8],
    algorithm: SigningAlgorithm,
    clock: &dyn Clock,
) -> Result<IdentityPayload, AuthError> {
    let header = decode_segments(token)?;

    let declared: RawHeader =
        serde_json::from_slice(&header).map_err(|_| AuthError::MalformedToken)?;
    if SigningAlgorithm::from_header(&declared.alg) != Some(algorithm) {
        tracing::debug!(alg = %declared.alg, "Rejected token algorithm");
        return Err(AuthError::UnsupportedAlgorithm(declared.alg));
    }

    let mut validation = Validation::new(algorithm.jwt_algorithm());
    // Expiry is checked below against the injected clock
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(map_jwt_error)?;

    if claims.exp <= 0 {
        return Err(AuthError::MalformedToken);
    }
    if claims.is_expired_at(clock.now()) {
        tracing::debug!(exp = claims.exp, "Token expired");
        return Err(AuthError::ExpiredToken);
    }

    claims.decode()
}

/// Split into exactly three base64url segments and return the decoded header.
fn decode_segments(token: &str) -> Result<Vec<u8>, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::MalformedToken);
    }

    let mut decoded = segments
        .iter()
        .map(|segment| URL_SAFE_NO_PAD.decode(segment))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AuthError::MalformedToken)?;

    Ok(decoded.swap_remove(0))
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm(err.to_string()),
        _ => {
            tracing::debug!(error = %err, "Token claims could not be decoded");
            AuthError::MalformedToken
        }
    }
}

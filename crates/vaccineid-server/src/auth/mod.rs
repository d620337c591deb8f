//! Caller authorization
//!
//! Bearer tokens are checked in three steps:
//!
//! 1. extract the token from `Authorization: Bearer <token>`
//! 2. verify signature and registered claims against the tenant's JWKS
//! 3. compare the `scp` claim with the single required scope
//!
//! Steps 1 and 2 failing yields [`Authorization::Invalid`], step 3 failing
//! yields [`Authorization::Denied`].

mod jwks;
mod verifier;

pub use jwks::{JwksClient, KeyResolver, StaticKeys};
pub use verifier::{TokenVerifier, VerifierSettings};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

/// Outcome of authorizing a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// Valid token carrying the required scope
    Granted,
    /// Valid token with a different scope
    Denied,
    /// Missing, malformed or unverifiable token
    Invalid,
}

/// Reasons a token fails verification
///
/// Logged, never returned to the caller.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token header has no key id")]
    MissingKeyId,

    #[error("signing key lookup failed: {0}")]
    KeyLookup(String),

    #[error("no signing key with id '{0}'")]
    UnknownKey(String),

    #[error("{0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token is missing the scp claim")]
    MissingScope,

    #[error("token was issued in the future")]
    IssuedInFuture,
}

/// Token from an `Authorization: Bearer <token>` header
///
/// Returns `None` unless the header is exactly a `Bearer` scheme followed by
/// one token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();

    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    Some(token)
}

// src/error.rs

use thiserror::Error;

/// A convenience alias used throughout the crate.
pub type Result<T, E = IdTokenError> = std::result::Result<T, E>;

/// The primary error type for the `ms-id-token` library.
///
/// Every variant is terminal for the `check` call that produced it; nothing is
/// retried internally. Callers decide how to surface each kind.
#[derive(Debug, Error)]
pub enum IdTokenError {
    /// The token does not have three dot-separated segments, or its payload
    /// or signature segment is empty.
    #[error("Malformed token: expected header.payload.signature")]
    MalformedToken,

    /// The header is undecodable, or its `typ`/`alg`/`kid` fields do not match
    /// the pinned expectations.
    #[error("Bad token header format")]
    BadHeaderFormat,

    /// A required claim is missing or malformed, or the issuer matches none of
    /// the accepted patterns.
    #[error("Bad token claims format")]
    BadClaimsFormat,

    /// The discovery document could not be fetched or parsed.
    #[error("Unable to fetch provider configuration: {0}")]
    ConfigFetchFailed(String),

    /// The signing key document could not be fetched.
    #[error("Unable to fetch provider signing keys: {0}")]
    CertsFetchFailed(String),

    /// The discovery document has no `jwks_uri`.
    #[error("The provider configuration does not contain a 'jwks_uri'")]
    KeysUriMissing,

    /// The signing key document is not a usable key set.
    #[error("Invalid signing key set format: {0}")]
    KeysFormatInvalid(String),

    /// The `aud` claim does not equal the expected audience.
    #[error("Invalid audience")]
    InvalidAudience,

    /// The `exp` claim lies in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// The `nbf` claim lies in the future.
    #[error("Token is not yet valid")]
    TokenNotYetValid,

    /// No key matches the header's `kid`, or the RS256 signature does not verify.
    #[error("Invalid token signature: {0}")]
    SignatureInvalid(String),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Outcome of a failed "fetch JSON resource" call.
///
/// This is the vocabulary of the transport layer. The key provider translates
/// it into the [`IdTokenError`] kind of the stage that was running.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body is not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    Body(String),
}

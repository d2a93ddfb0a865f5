// src/claims.rs

use crate::error::{IdTokenError, Result};
use jsonwebtoken::{Algorithm, Header};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::time::Duration;
use tracing::debug;

/// The only accepted `typ` header value.
pub const TOKEN_TYPE: &str = "JWT";

/// The only accepted signing algorithm.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claims that must be present (and non-null) in every accepted token.
pub const REQUIRED_CLAIMS: [&str; 7] = ["aud", "exp", "nbf", "sub", "iss", "iat", "tid"];

/// The decoded JOSE header of a signature-verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub typ: Option<String>,
    pub alg: Algorithm,
    pub kid: Option<String>,
}

impl From<Header> for TokenHeader {
    fn from(header: Header) -> Self {
        Self {
            typ: header.typ,
            alg: header.alg,
            kid: header.kid,
        }
    }
}

/// The validated claim set of an ID token.
///
/// The registered claims are typed. Everything else the provider sent
/// (`name`, `email`, `nonce`, `oid`, ...) is passed through untouched in
/// `extra`, so serializing a `TokenClaims` gives back the original payload.
///
/// `exp`, `nbf` and `iat` are NumericDates and may carry a fractional part,
/// so they are kept as the number the provider sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub tid: String,
    pub exp: Number,
    pub nbf: Number,
    pub iat: Number,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// `exp` in Unix seconds.
    pub fn expires_at(&self) -> f64 {
        numeric_date(&self.exp)
    }

    /// `nbf` in Unix seconds.
    pub fn not_before(&self) -> f64 {
        numeric_date(&self.nbf)
    }

    /// `iat` in Unix seconds.
    pub fn issued_at(&self) -> f64 {
        numeric_date(&self.iat)
    }

    pub fn name(&self) -> Option<&str> {
        self.extra_str("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.extra_str("email")
    }

    pub fn nonce(&self) -> Option<&str> {
        self.extra_str("nonce")
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.extra_str("preferred_username")
    }

    /// Any other claim, by name.
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.extra.get(claim)
    }

    /// The tenant segment of `iss`, as captured by the first matching pattern.
    pub fn tenant_from_issuer<'a>(&'a self, issuer_patterns: &[Regex]) -> Option<&'a str> {
        issuer_patterns
            .iter()
            .find_map(|pattern| pattern.captures(&self.iss)?.get(1))
            .map(|m| m.as_str())
    }

    fn extra_str(&self, claim: &str) -> Option<&str> {
        self.extra.get(claim).and_then(Value::as_str)
    }
}

/// Checks the header of a token whose signature has already been verified.
pub fn verify_header(header: &TokenHeader) -> Result<()> {
    let valid_header = header.typ.as_deref() == Some(TOKEN_TYPE)
        && header.alg == TOKEN_ALGORITHM
        && header.kid.as_deref().is_some_and(|kid| !kid.is_empty());

    if valid_header {
        Ok(())
    } else {
        debug!("Rejected token header: {:?}", header);
        Err(IdTokenError::BadHeaderFormat)
    }
}

/// Checks the claims of a signature-verified token, in order: structure and
/// issuer, audience, expiry, not-before. The first failure is returned.
///
/// `now` is in Unix seconds. `leeway` widens both ends of the validity window.
pub fn verify_claims(
    claims: Map<String, Value>,
    expected_audience: &str,
    issuer_patterns: &[Regex],
    leeway: Duration,
    now: i64,
) -> Result<TokenClaims> {
    verify_structure(&claims, issuer_patterns)?;

    if claims.get("aud").and_then(Value::as_str) != Some(expected_audience) {
        debug!("Audience {:?} does not match expected '{}'", claims.get("aud"), expected_audience);
        return Err(IdTokenError::InvalidAudience);
    }

    let claims: TokenClaims = serde_json::from_value(Value::Object(claims)).map_err(|e| {
        debug!("Claims do not deserialize: {}", e);
        IdTokenError::BadClaimsFormat
    })?;

    let now = now as f64;
    let leeway = leeway.as_secs_f64();

    if claims.expires_at() + leeway < now {
        debug!("Token expired at {}", claims.exp);
        return Err(IdTokenError::TokenExpired);
    }

    if claims.not_before() - leeway > now {
        debug!("Token not valid before {}", claims.nbf);
        return Err(IdTokenError::TokenNotYetValid);
    }

    Ok(claims)
}

fn verify_structure(claims: &Map<String, Value>, issuer_patterns: &[Regex]) -> Result<()> {
    if let Some(missing) = REQUIRED_CLAIMS
        .iter()
        .find(|name| claims.get(**name).map_or(true, Value::is_null))
    {
        debug!("Required claim '{}' is missing", missing);
        return Err(IdTokenError::BadClaimsFormat);
    }

    let timestamps_are_numbers = ["exp", "nbf", "iat"]
        .iter()
        .all(|name| claims.get(*name).is_some_and(Value::is_number));
    let identifiers_are_strings = ["sub", "tid"]
        .iter()
        .all(|name| claims.get(*name).is_some_and(Value::is_string));
    if !timestamps_are_numbers || !identifiers_are_strings {
        debug!("Registered claims have unexpected types");
        return Err(IdTokenError::BadClaimsFormat);
    }

    let issuer = claims.get("iss").and_then(Value::as_str).unwrap_or_default();
    if !issuer_patterns.iter().any(|pattern| pattern.is_match(issuer)) {
        debug!("Issuer '{}' matches no accepted pattern", issuer);
        return Err(IdTokenError::BadClaimsFormat);
    }

    Ok(())
}

fn numeric_date(value: &Number) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

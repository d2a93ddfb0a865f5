// src/token.rs

use crate::claims::{TokenHeader, TOKEN_ALGORITHM};
use crate::error::{IdTokenError, Result};
use crate::keys::SigningKeySet;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::{Map, Value};
use tracing::debug;

/// The three raw, still base64url-encoded segments of a compact JWS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSegments<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

/// Splits `token` on `.` into header, payload and signature.
///
/// An empty header is let through here; it is rejected once the header is decoded.
pub fn parse(token: &str) -> Result<TokenSegments<'_>> {
    let mut parts = token.split('.');
    let header = parts.next().unwrap_or_default();
    let payload = parts.next().filter(|s| !s.is_empty());
    let signature = parts.next().filter(|s| !s.is_empty());

    match (payload, signature, parts.next()) {
        (Some(payload), Some(signature), None) => Ok(TokenSegments {
            header,
            payload,
            signature,
        }),
        _ => Err(IdTokenError::MalformedToken),
    }
}

/// Verifies the RS256 signature of `token` with the key its header names.
///
/// The algorithm is pinned here, independently of the header checks that run
/// later, so a header claiming `none` or an HMAC algorithm never reaches a key.
/// Registered time and audience claims are deliberately not checked; that is
/// the claims validator's job.
pub fn verify_signature(
    token: &str,
    keys: &SigningKeySet,
) -> Result<(TokenHeader, Map<String, Value>)> {
    let header = decode_header(token).map_err(|e| {
        debug!("Undecodable token header: {}", e);
        IdTokenError::BadHeaderFormat
    })?;

    let kid = header
        .kid
        .as_deref()
        .ok_or_else(|| IdTokenError::SignatureInvalid("token header has no 'kid'".to_string()))?;
    let key = keys.get(kid).ok_or_else(|| {
        IdTokenError::SignatureInvalid(format!("no signing key found for kid '{}'", kid))
    })?;

    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data =
        decode::<Map<String, Value>>(token, &key.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                // The signature checked out but the payload is not a JSON object.
                ErrorKind::Json(_) | ErrorKind::Utf8(_) => IdTokenError::BadClaimsFormat,
                _ => IdTokenError::SignatureInvalid(e.to_string()),
            }
        })?;

    Ok((TokenHeader::from(token_data.header), token_data.claims))
}

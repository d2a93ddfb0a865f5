// src/model.rs

use serde::Deserialize;

/// The subset of an OIDC provider's discovery document that the validator consumes.
/// Found at the `.well-known/openid-configuration` endpoint.
///
/// `jwks_uri` is optional here so that its absence can be reported precisely
/// instead of as a generic parse failure.
#[derive(Debug, Deserialize)]
pub struct OidcDiscoveryDocument {
    pub jwks_uri: Option<String>,
}

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
///
/// Only `kty` is mandatory; records the validator cannot use are skipped, not rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKey {
    pub kid: Option<String>,
    pub kty: String,
    #[serde(rename = "use")]
    pub use_purpose: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

/// Represents a JSON Web Key Set (JWKS), which is a collection of JWKs.
#[derive(Debug, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

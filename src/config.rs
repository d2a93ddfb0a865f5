// src/config.rs

use crate::error::{IdTokenError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use url::Url;

/// The Microsoft identity platform's multi-tenant discovery document.
pub const DEFAULT_DISCOVERY_URL: &str =
    "https://login.microsoftonline.com/common/v2.0/.well-known/openid-configuration";

/// How long a fetched key set stays usable, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

/// Issuers accepted by default: the v2.0 endpoint and the v1.0 STS form,
/// each scoped to a tenant captured in group 1.
pub const DEFAULT_ISSUER_PATTERNS: [&str; 2] = [
    r"https://login\.microsoftonline\.com/(.+)/v2\.0",
    r"https://sts\.windows\.net/(.+)/",
];

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

static DEFAULT_DISCOVERY: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_DISCOVERY_URL).expect("default discovery URL parses"));

static DEFAULT_ISSUERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_ISSUER_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("default issuer pattern compiles"))
        .collect()
});

/// The main configuration for the ID token validator.
///
/// Construct it with [`ConfigBuilder`]; `Config::default()` is the stock
/// Microsoft configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Where the provider's discovery document lives.
    pub discovery_url: Url,
    /// Key set time-to-live in seconds. Zero or negative disables caching.
    pub cache_ttl_secs: i64,
    /// Clock skew tolerated on `exp` and `nbf`. Zero unless set explicitly.
    pub leeway: Duration,
    /// Accepted `iss` patterns. A token is accepted if any of them matches.
    pub issuer_patterns: Vec<Regex>,
    /// Request timeout for the built-in HTTP fetcher.
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery_url: DEFAULT_DISCOVERY.clone(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            leeway: Duration::ZERO,
            issuer_patterns: DEFAULT_ISSUERS.clone(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// A builder for creating a `Config` instance.
#[derive(Default)]
pub struct ConfigBuilder {
    discovery_url: Option<Url>,
    cache_ttl_secs: Option<i64>,
    leeway: Option<Duration>,
    issuer_patterns: Option<Vec<String>>,
    http_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the discovery document URL.
    ///
    /// # Errors
    ///
    /// Returns [`IdTokenError::InvalidUrl`] if `url` does not parse.
    pub fn discovery_url(mut self, url: &str) -> Result<Self> {
        let parsed_url = Url::parse(url).map_err(|e| IdTokenError::InvalidUrl(e.to_string()))?;
        self.discovery_url = Some(parsed_url);
        Ok(self)
    }

    /// Sets the key set time-to-live in seconds.
    /// A non-positive value makes every call refetch the keys.
    pub fn cache_ttl_secs(mut self, ttl: i64) -> Self {
        self.cache_ttl_secs = Some(ttl);
        self
    }

    /// Allows `exp`/`nbf` to be off by up to `leeway`.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = Some(leeway);
        self
    }

    /// Replaces the accepted issuer patterns. Patterns are unanchored regexes;
    /// capture group 1, if present, is taken to be the tenant.
    pub fn issuer_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issuer_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the request timeout for the built-in HTTP fetcher.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns [`IdTokenError::InvalidConfiguration`] if an issuer pattern does
    /// not compile or the pattern list is empty.
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();

        let issuer_patterns = match self.issuer_patterns {
            None => defaults.issuer_patterns,
            Some(patterns) if patterns.is_empty() => {
                return Err(IdTokenError::InvalidConfiguration(
                    "at least one issuer pattern is required".to_string(),
                ));
            }
            Some(patterns) => patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        IdTokenError::InvalidConfiguration(format!("issuer pattern '{}': {}", p, e))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Config {
            discovery_url: self.discovery_url.unwrap_or(defaults.discovery_url),
            cache_ttl_secs: self.cache_ttl_secs.unwrap_or(defaults.cache_ttl_secs),
            leeway: self.leeway.unwrap_or(defaults.leeway),
            issuer_patterns,
            http_timeout: self.http_timeout.unwrap_or(defaults.http_timeout),
        })
    }
}

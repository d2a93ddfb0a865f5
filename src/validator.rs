// src/validator.rs

use crate::claims::{verify_claims, verify_header, TokenClaims};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{IdTokenError, Result};
use crate::fetch::{HttpFetcher, JsonFetcher};
use crate::keys::KeyProvider;
use crate::token::{parse, verify_signature};
use std::sync::Arc;
use tracing::{debug, instrument};

/// The ID token validator.
///
/// Create one per consumer application and reuse it; it owns its signing key
/// cache. The validator is cheap to clone and safe to share between tasks.
#[derive(Clone)]
pub struct Validator {
    // The validator is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    key_provider: KeyProvider,
    clock: Arc<dyn Clock>,
}

impl Validator {
    /// Creates a validator that fetches over HTTPS and reads the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`IdTokenError::InvalidConfiguration`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.http_timeout)
            .map_err(|e| IdTokenError::InvalidConfiguration(e.to_string()))?;
        Ok(Self::with_collaborators(config, Arc::new(fetcher), Arc::new(SystemClock)))
    }

    /// Creates a validator with an explicit fetcher and clock.
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn JsonFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key_provider = KeyProvider::new(
            config.discovery_url.clone(),
            config.cache_ttl_secs,
            fetcher,
            clock.clone(),
        );
        Self {
            inner: Arc::new(Inner {
                config,
                key_provider,
                clock,
            }),
        }
    }

    /// Validates an ID token issued for `expected_audience`.
    ///
    /// Runs, in order: segment parsing, key lookup (refreshing the key cache if
    /// stale), RS256 signature verification, header checks and claims checks.
    /// The first failing stage's error is returned and no claims escape.
    #[instrument(skip(self, token), err(level = "warn"))]
    pub async fn check(
        &self,
        token: &str,
        expected_audience: &str,
    ) -> Result<TokenClaims> {
        parse(token)?;

        let keys = self.inner.key_provider.get_keys().await?;
        let (header, claims) = verify_signature(token, &keys)?;

        verify_header(&header)?;
        let claims = verify_claims(
            claims,
            expected_audience,
            &self.inner.config.issuer_patterns,
            self.inner.config.leeway,
            self.inner.clock.now(),
        )?;

        debug!("Accepted token for subject '{}' in tenant '{}'", claims.sub, claims.tid);
        Ok(claims)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The signing key cache backing this validator.
    pub fn key_provider(&self) -> &KeyProvider {
        &self.inner.key_provider
    }
}

// src/keys.rs

use crate::clock::Clock;
use crate::error::{FetchError, IdTokenError, Result};
use crate::fetch::JsonFetcher;
use crate::model::{JsonWebKey, JsonWebKeySet, OidcDiscoveryDocument};
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A public signing key published by the provider.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    /// The `alg` the provider advertises for this key, if any.
    pub alg: Option<String>,
    pub decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

/// The provider's signing keys, in document order, addressable by `kid`.
///
/// A set is never modified after it is built; a refresh replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: Vec<SigningKey>,
    index: HashMap<String, usize>,
}

impl SigningKeySet {
    /// Builds a key set from a JWKS document.
    ///
    /// Records without a `kid`, records that are not RSA keys, and encryption
    /// keys (`use: "enc"`) are skipped. An RSA signing record without usable
    /// `n`/`e` components makes the whole document invalid.
    pub fn from_document(document: serde_json::Value) -> Result<Self> {
        let jwks: JsonWebKeySet = serde_json::from_value(document)
            .map_err(|e| IdTokenError::KeysFormatInvalid(e.to_string()))?;

        let mut keys = Vec::with_capacity(jwks.keys.len());
        for jwk in jwks.keys {
            let Some(kid) = jwk.kid.clone() else {
                warn!("Skipping {} key without a 'kid'", jwk.kty);
                continue;
            };
            if jwk.kty != "RSA" {
                warn!("Skipping signing key '{}' with unsupported kty '{}'", kid, jwk.kty);
                continue;
            }
            if jwk.use_purpose.as_deref() == Some("enc") {
                warn!("Skipping encryption key '{}'", kid);
                continue;
            }
            keys.push(rsa_key(kid, jwk)?);
        }
        Ok(Self::from_keys(keys))
    }

    /// Builds a key set from already-decoded keys. On duplicate `kid`s the first one wins.
    pub fn from_keys(keys: Vec<SigningKey>) -> Self {
        let mut index = HashMap::with_capacity(keys.len());
        for (position, key) in keys.iter().enumerate() {
            index.entry(key.kid.clone()).or_insert(position);
        }
        Self { keys, index }
    }

    /// Looks up the key with the given identifier.
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.index.get(kid).map(|&position| &self.keys[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SigningKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn rsa_key(kid: String, jwk: JsonWebKey) -> Result<SigningKey> {
    let n = jwk.n.as_deref().ok_or_else(|| {
        IdTokenError::KeysFormatInvalid(format!("RSA key '{}' missing 'n' component", kid))
    })?;
    let e = jwk.e.as_deref().ok_or_else(|| {
        IdTokenError::KeysFormatInvalid(format!("RSA key '{}' missing 'e' component", kid))
    })?;
    let decoding_key = DecodingKey::from_rsa_components(n, e)
        .map_err(|err| IdTokenError::KeysFormatInvalid(format!("RSA key '{}': {}", kid, err)))?;

    Ok(SigningKey {
        kid,
        alg: jwk.alg,
        decoding_key,
    })
}

/// A key set together with the time it was fetched and how long it may be used.
#[derive(Debug, Clone)]
pub struct CachedKeySet {
    pub keys: Arc<SigningKeySet>,
    /// Unix seconds.
    pub fetched_at: i64,
    pub ttl_secs: i64,
}

impl CachedKeySet {
    /// Usable only while `now < fetched_at + ttl`.
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.fetched_at.saturating_add(self.ttl_secs)
    }
}

/// Supplies the provider's signing keys, refreshing them lazily once stale.
///
/// Refresh is discovery document → `jwks_uri` → key document. Concurrent
/// callers that find the cache stale wait on a single refresh.
pub struct KeyProvider {
    discovery_url: Url,
    ttl_secs: i64,
    fetcher: Arc<dyn JsonFetcher>,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<Arc<CachedKeySet>>>,
    refreshes: AtomicU64,
}

impl KeyProvider {
    pub fn new(
        discovery_url: Url,
        ttl_secs: i64,
        fetcher: Arc<dyn JsonFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            discovery_url,
            ttl_secs,
            fetcher,
            clock,
            cache: RwLock::new(None),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Returns the cached key set if it is still fresh, refreshing it otherwise.
    #[instrument(skip(self), err)]
    pub async fn get_keys(&self) -> Result<Arc<SigningKeySet>> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh(self.clock.now()) {
                    debug!("Signing key cache hit (fetched at {})", cached.fetched_at);
                    return Ok(cached.keys.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(self.clock.now()) {
                debug!("Signing keys refreshed by a concurrent caller");
                return Ok(cached.keys.clone());
            }
        }

        debug!("Signing key cache empty or stale. Fetching from provider.");
        let keys = Arc::new(self.refresh().await?);
        *cache = Some(Arc::new(CachedKeySet {
            keys: keys.clone(),
            fetched_at: self.clock.now(),
            ttl_secs: self.ttl_secs,
        }));
        self.refreshes.fetch_add(1, Ordering::Relaxed);

        Ok(keys)
    }

    /// Drops the cached key set; the next [`get_keys`](Self::get_keys) refetches.
    pub async fn invalidate(&self) {
        self.cache.write().await.take();
    }

    /// Number of successful refreshes since construction.
    pub fn fetch_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of the cache entry, if any.
    pub async fn cached(&self) -> Option<Arc<CachedKeySet>> {
        self.cache.read().await.clone()
    }

    #[instrument(skip(self), fields(discovery_url = %self.discovery_url), err)]
    async fn refresh(&self) -> Result<SigningKeySet> {
        let jwks_uri = self.discover_jwks_uri().await?;

        let document = self.fetcher.fetch_json(&jwks_uri).await.map_err(|e| match e {
            FetchError::Body(detail) => IdTokenError::KeysFormatInvalid(detail),
            other => IdTokenError::CertsFetchFailed(other.to_string()),
        })?;

        let keys = SigningKeySet::from_document(document)?;
        info!("Successfully fetched {} signing keys from {}", keys.len(), jwks_uri);
        Ok(keys)
    }

    async fn discover_jwks_uri(&self) -> Result<Url> {
        debug!("Performing OIDC discovery at: {}", self.discovery_url);
        let document = self
            .fetcher
            .fetch_json(&self.discovery_url)
            .await
            .map_err(|e| IdTokenError::ConfigFetchFailed(e.to_string()))?;

        let discovery_doc: OidcDiscoveryDocument = serde_json::from_value(document)
            .map_err(|e| IdTokenError::ConfigFetchFailed(e.to_string()))?;

        let jwks_uri = discovery_doc.jwks_uri.ok_or(IdTokenError::KeysUriMissing)?;
        debug!("Discovered JWKS URI: {}", jwks_uri);

        Url::parse(&jwks_uri)
            .map_err(|e| IdTokenError::CertsFetchFailed(format!("invalid jwks_uri '{}': {}", jwks_uri, e)))
    }
}

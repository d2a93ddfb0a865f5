// src/lib.rs

pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod model;
pub mod token;
pub mod validator;

/// The public prelude for the `ms-id-token` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::claims::{TokenClaims, TokenHeader};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::error::{FetchError, IdTokenError};
    pub use crate::fetch::{HttpFetcher, JsonFetcher};
    pub use crate::keys::{KeyProvider, SigningKeySet};
    pub use crate::validator::Validator;
    pub use jsonwebtoken::Algorithm;
}

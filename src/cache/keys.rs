//! Cache key derivation.
//!
//! A key is the URL-safe base64 SHA-256 digest of the wrapped operation's declared
//! identity, followed by a NUL separator and the parameter when one is supplied.
//! Keys only depend on those strings, so they stay valid across restarts and
//! builds, which is what lets the persisted tier hit from a fresh process.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use sha2::{Digest, Sha256};

const PARAM_SEPARATOR: [u8; 1] = [0];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(identity: &str, param: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        if let Some(param) = param {
            hasher.update(PARAM_SEPARATOR);
            hasher.update(param.as_bytes());
        }
        Self(URL_SAFE.encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

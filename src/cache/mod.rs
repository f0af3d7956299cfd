//! Two-tier TTL memoization for expensive loads.
//!
//! - **Tier 1**: a process-wide [`LocalCache`] shared by every wrapped operation.
//! - **Tier 2**: an optional [`ExternalCache`] (the Postgres `cache` table in
//!   production) that lets a freshly started process reuse values computed by
//!   another one.
//!
//! Operations are wrapped with [`Cached::new`] or [`Cached::with_param`] and
//! always produce raw bytes; [`codec`] turns records into bytes and back.
//!
//! ```toml
//! [cache]
//! max_age_seconds = 3600
//! persist = true
//! ```

mod cached;
pub mod codec;
mod config;
mod external;
mod keys;
mod store;

pub use cached::Cached;
pub use codec::CodecError;
pub use config::{CacheOptions, DEFAULT_MAX_AGE};
pub use external::{CacheError, ExternalCache};
pub use keys::CacheKey;
pub use store::{CacheElement, FAR_FUTURE, LocalCache};

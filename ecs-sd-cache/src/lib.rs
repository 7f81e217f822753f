//! TTL cache for ECS-SD.
//!
//! Generic in-memory cache with per-entry expiration, optional stale reads,
//! and an optional background janitor that evicts expired entries.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;

pub use cache::{CacheConfig, Lookup, TtlCache};

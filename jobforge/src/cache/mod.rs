//! Bounded caching primitives.
//!
//! The pool itself does not cache anything; this module exists for clients
//! that memoize computed job results and share the cache across worker
//! threads.

mod lru;

pub use lru::LruCache;

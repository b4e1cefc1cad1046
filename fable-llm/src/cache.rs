//! Narrative cache: contract, key derivation, and an in-process LRU.
//!
//! Keys are the lowercase hex SHA-256 of the fully rendered prompt, so two
//! turns that render the same prompt share one entry. Values are the UTF-8
//! bytes of the final narrative text.

use std::future::Future;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use fable_core::config::CacheConfig;

use crate::error::LlmError;

/// Cache key for a rendered prompt.
#[must_use]
pub fn cache_key(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Key/value store consulted by [`crate::NarrativeGenerator`].
///
/// Errors are never fatal to generation: a failed `get` is a miss and a
/// failed `set` is logged and dropped.
pub trait NarrativeCache: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`LlmError::CacheUnavailable`] if the store cannot be reached.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, LlmError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// [`LlmError::CacheUnavailable`] if the store cannot be reached.
    fn set(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<(), LlmError>> + Send;
}

/// Bounded in-process cache; evicts the least recently used entry.
#[derive(Debug)]
pub struct LruNarrativeCache {
    entries: Mutex<LruCache<String, Vec<u8>>>,
}

impl LruNarrativeCache {
    /// Cache holding at most `capacity` narratives (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cache sized from the `[cache]` config section.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Number of cached narratives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl NarrativeCache for LruNarrativeCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LlmError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), LlmError> {
        self.entries.lock().put(key.to_string(), value);
        Ok(())
    }
}

/// A cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl NarrativeCache for NoCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, LlmError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), LlmError> {
        Ok(())
    }
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiled template caching.
//!
//! The [`Loader`](crate::Loader) keeps every template it compiles in a
//! [`Cache`] keyed by template name, so loading a name twice returns the same
//! `Arc<Template>` without touching the sources again.
//!
//! # Cache Implementations
//!
//! - [`MemoryCache`]: in-memory LRU cache, bounded or unbounded
//! - [`NoOpCache`]: never stores anything, every load compiles fresh
//!
//! # Custom Caches
//!
//! Implement the [`Cache`] trait for other strategies.

use crate::error::{Result, TemplateError};
use crate::template::Template;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Trait for compiled template caches.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait Cache: Send + Sync + std::fmt::Debug {
    /// Retrieves a template from the cache.
    fn get(&self, key: &str) -> Result<Option<Arc<Template>>>;
    /// Stores a template in the cache.
    fn set(&self, key: &str, template: Arc<Template>) -> Result<()>;
    /// Removes a template from the cache.
    fn remove(&self, key: &str) -> Result<()>;
    /// Clears all cached templates.
    fn clear(&self) -> Result<()>;
    /// Checks if a key exists in the cache.
    fn contains_key(&self, key: &str) -> bool;
    /// Creates a boxed clone sharing the same storage.
    fn clone_box(&self) -> Box<dyn Cache>;
}

impl Clone for Box<dyn Cache> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// In-memory LRU (Least Recently Used) cache.
///
/// With a capacity, the least recently used template is evicted once the
/// cache is full. Without one, templates stay until cleared.
///
/// # Examples
///
/// ```rust
/// use typhoon::{Cache, MemoryCache};
///
/// let bounded = MemoryCache::new(100);
/// let unbounded = MemoryCache::unbounded();
/// assert!(!bounded.contains_key("index.html"));
/// assert!(!unbounded.contains_key("index.html"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCache {
    cache: Arc<Mutex<LruCache<String, Arc<Template>>>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` templates.
    ///
    /// A capacity of zero means unbounded.
    pub fn new(capacity: usize) -> Self {
        let lru_cache = match NonZeroUsize::new(capacity) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            cache: Arc::new(Mutex::new(lru_cache)),
        }
    }

    /// Creates a cache that never evicts.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<String, Arc<Template>>>> {
        self.cache
            .lock()
            .map_err(|_| TemplateError::Cache("Failed to acquire cache lock".to_string()))
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Arc<Template>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, template: Arc<Template>) -> Result<()> {
        self.lock()?.put(key.to_string(), template);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.pop(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.cache.lock().map(|cache| cache.contains(key)).unwrap_or(false)
    }

    fn clone_box(&self) -> Box<dyn Cache> {
        Box::new(Self {
            cache: Arc::clone(&self.cache),
        })
    }
}

/// No-op cache that never stores or retrieves anything.
///
/// Useful while editing templates, where every load should see fresh source.
#[derive(Debug, Clone, Default)]
pub struct NoOpCache;

impl NoOpCache {
    /// Creates a new no-op cache.
    pub fn new() -> Self {
        Self
    }
}

impl Cache for NoOpCache {
    fn get(&self, _key: &str) -> Result<Option<Arc<Template>>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _template: Arc<Template>) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn contains_key(&self, _key: &str) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Cache> {
        Box::new(NoOpCache)
    }
}

//! # Response Cache
//!
//! Keyed store of rendered pages with a fixed time-to-live. Entries are never
//! invalidated by content changes: a cached page is served until it expires
//! or the whole cache is flushed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_TTL: Duration = Duration::from_secs(20);
pub const DEFAULT_KEY_PREFIX: &str = "index_page";

#[derive(Debug)]
struct Entry {
    body: Arc<str>,
    expires_at: Instant,
}

#[derive(Debug)]
struct Inner {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    prefix: String,
}

/// Shared handle; clones see the same entries.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<Inner>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX, DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                ttl,
                prefix: prefix.into(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.inner.prefix, key)
    }

    /// Returns the live entry for `key`, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        let full_key = self.full_key(key);
        let now = Instant::now();
        {
            let entry = self.inner.entries.get(&full_key)?;
            if entry.expires_at > now {
                return Some(entry.body.clone());
            }
        }
        self.inner
            .entries
            .remove_if(&full_key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Stores `body` under `key` for one TTL window. Last write wins.
    /// Expired entries under any key are swept first.
    pub fn insert(&self, key: &str, body: impl Into<Arc<str>>) -> Arc<str> {
        let body = body.into();
        let now = Instant::now();
        self.sweep(now);
        self.inner.entries.insert(
            self.full_key(key),
            Entry {
                body: body.clone(),
                expires_at: now + self.inner.ttl,
            },
        );
        body
    }

    fn sweep(&self, now: Instant) {
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, entry| entry.expires_at > now);
        let swept = before.saturating_sub(self.inner.entries.len());
        if swept > 0 {
            debug!(swept, "expired cache entries dropped");
        }
    }

    /// Serves the cached body for `key`, or renders, stores and returns a
    /// fresh one. Failed renders are not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, render: F) -> Result<Arc<str>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(body) = self.get(key) {
            debug!(key, "response cache hit");
            return Ok(body);
        }
        debug!(key, "response cache miss");
        let body = render().await?;
        Ok(self.insert(key, body))
    }

    /// Drops every entry. Returns how many were dropped.
    pub fn flush(&self) -> usize {
        let dropped = self.inner.entries.len();
        self.inner.entries.clear();
        info!(dropped, "response cache flushed");
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

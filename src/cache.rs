// Author: Dustin Pilgrim
// License: MIT

//! Process-wide memo of built configurations.
//!
//! Entries are keyed by the loader that produced them plus a caller-chosen
//! key. Only one loader is remembered at a time: asking with a different
//! loader throws away everything cached for the previous one.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

use crate::config::Config;
use crate::error::Result;

static NEXT_LOADER: AtomicU64 = AtomicU64::new(1);

static CACHE: Lazy<Mutex<LoaderCache>> = Lazy::new(|| Mutex::new(LoaderCache::default()));

/// Identity of whatever loads configuration text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderId(Arc<str>);

impl LoaderId {
    /// A fresh identity, distinct from every other.
    pub fn new() -> Self {
        let n = NEXT_LOADER.fetch_add(1, Ordering::Relaxed);
        Self(Arc::from(format!("loader-{}", n)))
    }

    /// An identity that is equal to every other one created with the same name.
    pub fn named(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl Default for LoaderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct LoaderCache {
    current: Option<LoaderId>,
    entries: HashMap<String, Config>,
}

impl LoaderCache {
    fn switch_to(&mut self, loader: &LoaderId) {
        if self.current.as_ref() != Some(loader) {
            if !self.entries.is_empty() {
                log::debug!("loader changed to {}, dropping {} cached configs", loader, self.entries.len());
            }
            self.entries.clear();
            self.current = Some(loader.clone());
        }
    }
}

// The cache holds only finished values, so a panic elsewhere cannot leave it half updated.
fn lock() -> MutexGuard<'static, LoaderCache> {
    CACHE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the config cached for `(loader, key)`, building it with `build` on a miss.
///
/// The lock is not held while `build` runs, so two threads may build the same
/// entry at once. The first one stored wins and both callers get it. Errors
/// from `build` are returned and nothing is cached.
///
/// # Examples
/// ```
/// use cairn_cfg::cache::{compute_cached_config, LoaderId};
/// use cairn_cfg::Config;
///
/// let loader = LoaderId::named("doc-example");
/// let config = compute_cached_config(&loader, "app", || Ok(Config::empty("app"))).unwrap();
/// assert!(config.is_resolved());
/// ```
pub fn compute_cached_config<F>(loader: &LoaderId, key: &str, build: F) -> Result<Config>
where
    F: FnOnce() -> Result<Config>,
{
    {
        let mut cache = lock();
        cache.switch_to(loader);
        if let Some(found) = cache.entries.get(key) {
            log::trace!("config cache hit for {} in {}", key, loader);
            return Ok(found.clone());
        }
    }

    log::debug!("building config {} for {}", key, loader);
    let built = build()?;

    let mut cache = lock();
    cache.switch_to(loader);
    let kept = cache.entries.entry(key.to_string()).or_insert(built);
    Ok(kept.clone())
}

/// Drops every cached config.
pub fn invalidate_caches() {
    let mut cache = lock();
    cache.entries.clear();
    cache.current = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CairnError;
    use std::cell::Cell;

    fn config(text: &str) -> Config {
        Config::from_json(text, "test").unwrap()
    }

    // One test, because every case shares the process-wide cache.
    #[test]
    fn test_compute_cached_config() {
        let loader = LoaderId::new();
        let builds = Cell::new(0);
        let build = || {
            builds.set(builds.get() + 1);
            Ok(config(r#"{"n": 1}"#))
        };

        let first = compute_cached_config(&loader, "a", build).unwrap();
        let second = compute_cached_config(&loader, "a", build).unwrap();
        assert_eq!(first, second);
        assert_eq!(builds.get(), 1);

        compute_cached_config(&loader, "b", build).unwrap();
        assert_eq!(builds.get(), 2);

        // a new loader starts from nothing
        let other = LoaderId::new();
        assert_ne!(other, loader);
        compute_cached_config(&other, "a", build).unwrap();
        assert_eq!(builds.get(), 3);
        compute_cached_config(&loader, "a", build).unwrap();
        assert_eq!(builds.get(), 4);

        // failures are not remembered
        let failed = compute_cached_config(&loader, "c", || Err(CairnError::generic("boom")));
        assert!(failed.is_err());
        let ok = compute_cached_config(&loader, "c", || Ok(config(r#"{"c": true}"#))).unwrap();
        assert!(ok.has("c"));

        // a racing build that stores first wins
        let winner = compute_cached_config(&loader, "race", || {
            compute_cached_config(&loader, "race", || Ok(config(r#"{"who": "inner"}"#)))?;
            Ok(config(r#"{"who": "outer"}"#))
        })
        .unwrap();
        assert_eq!(winner.get::<String>("who").unwrap(), "inner");

        invalidate_caches();
        compute_cached_config(&loader, "a", build).unwrap();
        assert_eq!(builds.get(), 5);
    }

    #[test]
    fn test_named_loaders_compare_by_name() {
        assert_eq!(LoaderId::named("x"), LoaderId::named("x"));
        assert_ne!(LoaderId::named("x"), LoaderId::named("y"));
        assert_eq!(LoaderId::named("x").to_string(), "x");
    }
}

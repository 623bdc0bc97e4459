//! Memoization of rendered marker icons.
//!
//! Icon construction on the surface is the most repeated piece of work
//! during reconciliation, so rendered icons are memoized keyed by everything
//! that affects their appearance. The cache is invalidated wholesale
//! whenever any input dimension changes (display mode, size profile),
//! never per-entry.

use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::icon::Color;
use crate::marker::MarkerId;
use crate::surface::IconHandle;

/// Default maximum number of memoized icons.
pub const DEFAULT_ICON_CACHE_CAPACITY: u64 = 4096;

/// Composite key identifying one rendered icon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconKey {
    pub marker_id: MarkerId,
    pub glyph_index: u8,
    pub color: Color,
    /// Display mode fingerprint (see `MetricRegime::cache_tag`).
    pub mode_tag: String,
    pub size: (u32, u32),
}

/// Why the cache was invalidated; logged for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The display mode (metric or clustering modifier) changed.
    ModeChanged,
    /// The global icon size profile changed.
    ProfileChanged,
    /// The live set was cleared.
    Cleared,
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// Bounded memoization of rendered icon handles.
pub struct IconCache {
    cache: Cache<IconKey, IconHandle>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl IconCache {
    /// Creates a cache bounded to `capacity` entries.
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Looks up a rendered icon, constructing and memoizing it on a miss.
    pub fn get_or_insert_with<E>(
        &self,
        key: IconKey,
        build: impl FnOnce() -> Result<IconHandle, E>,
    ) -> Result<IconHandle, E> {
        if let Some(handle) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(handle);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let handle = build()?;
        self.cache.insert(key, handle);
        Ok(handle)
    }

    /// Drops every entry. Invalidation is always wholesale; a mode or
    /// profile change invalidates visuals for all markers at once.
    pub fn invalidate(&self, reason: InvalidationReason) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(?reason, "icon cache invalidated");
        self.cache.invalidate_all();
    }

    /// Point-in-time counters.
    pub fn stats(&self) -> IconCacheStats {
        IconCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for IconCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconCache")
            .field("entries", &self.cache.entry_count())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, glyph: u8) -> IconKey {
        IconKey {
            marker_id: MarkerId::new(id),
            glyph_index: glyph,
            color: Color::new(1, 2, 3),
            mode_tag: "d10".to_string(),
            size: (28, 28),
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = IconCache::default();
        let mut builds = 0;

        let first = cache
            .get_or_insert_with::<()>(key("a", 0), || {
                builds += 1;
                Ok(IconHandle(7))
            })
            .unwrap();
        let second = cache
            .get_or_insert_with::<()>(key("a", 0), || {
                builds += 1;
                Ok(IconHandle(8))
            })
            .unwrap();

        assert_eq!(first, IconHandle(7));
        assert_eq!(second, IconHandle(7), "hit must reuse the memoized handle");
        assert_eq!(builds, 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let cache = IconCache::default();
        cache
            .get_or_insert_with::<()>(key("a", 0), || Ok(IconHandle(1)))
            .unwrap();
        let other = cache
            .get_or_insert_with::<()>(key("a", 1), || Ok(IconHandle(2)))
            .unwrap();
        assert_eq!(other, IconHandle(2));
    }

    #[test]
    fn test_invalidate_is_wholesale() {
        let cache = IconCache::default();
        cache
            .get_or_insert_with::<()>(key("a", 0), || Ok(IconHandle(1)))
            .unwrap();
        cache
            .get_or_insert_with::<()>(key("b", 1), || Ok(IconHandle(2)))
            .unwrap();

        cache.invalidate(InvalidationReason::ModeChanged);

        // Both entries are gone, so both rebuild
        let mut builds = 0;
        for k in [key("a", 0), key("b", 1)] {
            cache
                .get_or_insert_with::<()>(k, || {
                    builds += 1;
                    Ok(IconHandle(9))
                })
                .unwrap();
        }
        assert_eq!(builds, 2);
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_build_error_is_not_cached() {
        let cache = IconCache::default();
        let result = cache.get_or_insert_with(key("a", 0), || Err("boom"));
        assert_eq!(result, Err("boom"));

        // A later successful build goes through
        let handle = cache
            .get_or_insert_with::<&str>(key("a", 0), || Ok(IconHandle(3)))
            .unwrap();
        assert_eq!(handle, IconHandle(3));
    }
}

//! Memo cache for decoded lookup results.

use crate::decode::TypeDescriptor;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(PartialEq, Eq, Hash)]
struct CacheKey {
    path: String,
    ty: TypeDescriptor,
    tags: Tags,
}

/// Memoizes fully-processed lookup results per (path, type, tags).
///
/// Entries are pinned to the tree generation they were decoded against;
/// a publish bumps the service generation and the next probe drops the
/// whole store. Lazy-tainted paths never reach the cache: the facade
/// skips the probe and the store for them, so a cached value is always
/// generation-stable.
pub struct ResultCache {
    generation: Mutex<u64>,
    entries: Mutex<HashMap<CacheKey, ConfigResult<AnyValue>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a memoized result, invalidating the store first when the
    /// tree generation moved.
    pub fn get(
        &self,
        path: &str,
        ty: &TypeDescriptor,
        tags: &Tags,
        generation: u64,
    ) -> Option<ConfigResult<AnyValue>> {
        self.sync_generation(generation);
        let entries = self.entries.lock();
        entries
            .get(&CacheKey {
                path: path.to_string(),
                ty: ty.clone(),
                tags: tags.clone(),
            })
            .cloned()
    }

    /// Memoize a result decoded against `generation`.
    pub fn store(
        &self,
        path: &str,
        ty: &TypeDescriptor,
        tags: &Tags,
        generation: u64,
        result: ConfigResult<AnyValue>,
    ) {
        self.sync_generation(generation);
        // Re-check under the entries lock: a concurrent publish may have
        // moved the generation between sync and insert.
        if *self.generation.lock() != generation {
            return;
        }
        let mut entries = self.entries.lock();
        entries.insert(
            CacheKey {
                path: path.to_string(),
                ty: ty.clone(),
                tags: tags.clone(),
            },
            result,
        );
    }

    /// Number of live entries, for diagnostics.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn sync_generation(&self, generation: u64) {
        let mut current = self.generation.lock();
        if *current != generation {
            *current = generation;
            self.entries.lock().clear();
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::FromConfig;
    use crate::decode::descriptor::downcast;
    use std::sync::Arc;

    fn ok_result(value: u32) -> ConfigResult<AnyValue> {
        ConfigResult::ok(Arc::new(value) as AnyValue)
    }

    #[test]
    fn stores_and_returns_per_key() {
        let cache = ResultCache::new();
        let ty = u32::descriptor();
        let tags = Tags::none();
        cache.store("db.port", &ty, &tags, 1, ok_result(5432));

        let hit = cache.get("db.port", &ty, &tags, 1).unwrap();
        assert_eq!(downcast::<u32>(&hit.value.unwrap()), Some(5432));
        assert!(cache.get("db.host", &ty, &tags, 1).is_none());
        assert!(cache.get("db.port", &ty, &Tags::environment("dev"), 1).is_none());
        assert!(
            cache.get("db.port", &String::descriptor(), &tags, 1).is_none(),
            "a different target type is a different key"
        );
    }

    #[test]
    fn generation_bump_invalidates_everything() {
        let cache = ResultCache::new();
        let ty = u32::descriptor();
        let tags = Tags::none();
        cache.store("db.port", &ty, &tags, 1, ok_result(5432));
        assert!(cache.get("db.port", &ty, &tags, 2).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_store_is_dropped() {
        let cache = ResultCache::new();
        let ty = u32::descriptor();
        let tags = Tags::none();
        cache.get("warm", &ty, &tags, 3);
        cache.store("db.port", &ty, &tags, 2, ok_result(1));
        assert!(cache.get("db.port", &ty, &tags, 3).is_none());
    }
}

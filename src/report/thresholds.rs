//! Pass/fail threshold resolution with a per-schema TTL cache.
//!
//! Thresholds come from the settings store keyed by schema (and section id
//! for per-section grades). Schema grades are queried at most once per
//! schema per TTL window; section grades are cached lazily inside the same
//! schema entry and expire and invalidate with it. Administrative changes
//! take effect immediately through the explicit invalidation operations.
//! Concurrent refreshes may race, but both writers store a fresh copy, so
//! staleness is the only risk.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use super::scoring::DEFAULT_PASSING_GRADE;
use super::sources::SettingsStore;

/// Resolved passing grades for one schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub overall: f64,
    pub section: f64,
    pub category: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            overall: DEFAULT_PASSING_GRADE,
            section: DEFAULT_PASSING_GRADE,
            category: DEFAULT_PASSING_GRADE,
        }
    }
}

struct CachedEntry {
    thresholds: Thresholds,
    /// Lazily filled per-section grades; `None` records a confirmed
    /// missing-row answer so the store is not re-asked within the window.
    sections: HashMap<String, Option<f64>>,
    fetched_at: Instant,
}

/// Time-caching resolver over a [`SettingsStore`].
pub struct ThresholdResolver<S> {
    store: S,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedEntry>>,
}

impl<S: SettingsStore> ThresholdResolver<S> {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(store: S, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Schema-level thresholds, from cache when fresh. Store errors and
    /// missing rows both resolve to the static 83/83/83 defaults; a store
    /// error is logged but not propagated.
    pub async fn get(&self, schema_id: &str) -> Thresholds {
        if let Some(cached) = self.fresh(schema_id) {
            return cached;
        }

        let thresholds = self.fetch(schema_id).await;
        let mut cache = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.insert(
            schema_id.to_string(),
            CachedEntry {
                thresholds,
                sections: HashMap::new(),
                fetched_at: Instant::now(),
            },
        );
        thresholds
    }

    /// Per-section passing grade, from cache when fresh; falls back to the
    /// schema-level section threshold when no section row exists. A store
    /// error is logged and falls back without poisoning the cache, so the
    /// next lookup retries.
    pub async fn section_threshold(&self, schema_id: &str, section_id: &str) -> f64 {
        let schema = self.get(schema_id).await;
        if let Some(cached) = self.fresh_section(schema_id, section_id) {
            return cached.unwrap_or(schema.section);
        }

        let grade = match self.store.passing_grade(schema_id, Some(section_id)).await {
            Ok(grade) => grade,
            Err(err) => {
                warn!(schema = schema_id, section = section_id, error = %err, "settings store unreachable, using schema section threshold");
                return schema.section;
            }
        };

        let mut cache = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = cache.get_mut(schema_id) {
            entry.sections.insert(section_id.to_string(), grade);
        }
        grade.unwrap_or(schema.section)
    }

    /// Drop one schema's cached thresholds so the next lookup re-queries.
    pub fn invalidate(&self, schema_id: &str) {
        let mut cache = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.remove(schema_id);
    }

    /// Drop every cached schema.
    pub fn invalidate_all(&self) {
        let mut cache = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.clear();
    }

    fn fresh(&self, schema_id: &str) -> Option<Thresholds> {
        let cache = self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = cache.get(schema_id)?;
        (entry.fetched_at.elapsed() < self.ttl).then_some(entry.thresholds)
    }

    fn fresh_section(&self, schema_id: &str, section_id: &str) -> Option<Option<f64>> {
        let cache = self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = cache.get(schema_id)?;
        if entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        entry.sections.get(section_id).copied()
    }

    async fn fetch(&self, schema_id: &str) -> Thresholds {
        match self.store.passing_grade(schema_id, None).await {
            Ok(Some(grade)) => Thresholds {
                overall: grade,
                section: grade,
                category: grade,
            },
            Ok(None) => Thresholds::default(),
            Err(err) => {
                warn!(schema = schema_id, error = %err, "settings store unreachable, using default thresholds");
                Thresholds::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::sources::SourceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        schema_grade: Option<f64>,
        section_grade: Option<f64>,
        fail: bool,
        schema_calls: AtomicUsize,
        section_calls: AtomicUsize,
    }

    impl CountingStore {
        fn returning(grade: Option<f64>) -> Self {
            Self {
                schema_grade: grade,
                section_grade: grade,
                fail: false,
                schema_calls: AtomicUsize::new(0),
                section_calls: AtomicUsize::new(0),
            }
        }

        fn schema_only(grade: f64) -> Self {
            Self {
                schema_grade: Some(grade),
                section_grade: None,
                fail: false,
                schema_calls: AtomicUsize::new(0),
                section_calls: AtomicUsize::new(0),
            }
        }

        fn unreachable_store() -> Self {
            Self {
                schema_grade: None,
                section_grade: None,
                fail: true,
                schema_calls: AtomicUsize::new(0),
                section_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SettingsStore for CountingStore {
        async fn passing_grade(
            &self,
            _schema_id: &str,
            section_id: Option<&str>,
        ) -> Result<Option<f64>, SourceError> {
            if self.fail {
                return Err(SourceError::Unavailable("connection refused".to_string()));
            }
            match section_id {
                Some(_) => {
                    self.section_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(self.section_grade)
                }
                None => {
                    self.schema_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(self.schema_grade)
                }
            }
        }
    }

    #[tokio::test]
    async fn cache_serves_repeat_lookups_within_ttl() {
        let resolver = ThresholdResolver::new(
            CountingStore::returning(Some(90.0)),
            Duration::from_secs(300),
        );

        let first = resolver.get("fsacr").await;
        let second = resolver.get("fsacr").await;

        assert_eq!(first.overall, 90.0);
        assert_eq!(second, first);
        assert_eq!(resolver.store.schema_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_is_keyed_by_schema() {
        let resolver = ThresholdResolver::new(
            CountingStore::returning(Some(88.0)),
            Duration::from_secs(300),
        );

        resolver.get("fsacr").await;
        resolver.get("fsbop").await;

        assert_eq!(resolver.store.schema_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_forces_a_refetch() {
        let resolver = ThresholdResolver::new(
            CountingStore::returning(Some(85.0)),
            Duration::from_secs(300),
        );

        resolver.get("fsacr").await;
        resolver.invalidate("fsacr");
        resolver.get("fsacr").await;

        assert_eq!(resolver.store.schema_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let resolver =
            ThresholdResolver::new(CountingStore::returning(Some(85.0)), Duration::ZERO);

        resolver.get("fsacr").await;
        resolver.get("fsacr").await;

        assert_eq!(resolver.store.schema_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_store_yields_static_defaults() {
        let resolver = ThresholdResolver::new(
            CountingStore::unreachable_store(),
            Duration::from_secs(300),
        );

        let thresholds = resolver.get("fsacr").await;
        assert_eq!(thresholds, Thresholds::default());
        assert_eq!(thresholds.overall, 83.0);
    }

    #[tokio::test]
    async fn missing_row_yields_static_defaults() {
        let resolver = ThresholdResolver::new(
            CountingStore::returning(None),
            Duration::from_secs(300),
        );

        let thresholds = resolver.get("unknown-schema").await;
        assert_eq!(thresholds, Thresholds::default());
    }

    #[tokio::test]
    async fn section_grades_are_cached_within_the_ttl() {
        let resolver = ThresholdResolver::new(
            CountingStore::returning(Some(90.0)),
            Duration::from_secs(300),
        );

        for _ in 0..5 {
            let grade = resolver.section_threshold("fsacr", "s1").await;
            assert_eq!(grade, 90.0);
        }

        assert_eq!(resolver.store.section_calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.store.schema_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn section_cache_is_keyed_by_section() {
        let resolver = ThresholdResolver::new(
            CountingStore::returning(Some(90.0)),
            Duration::from_secs(300),
        );

        resolver.section_threshold("fsacr", "s1").await;
        resolver.section_threshold("fsacr", "s2").await;
        resolver.section_threshold("fsacr", "s1").await;

        assert_eq!(resolver.store.section_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_section_row_caches_the_fallback_answer() {
        let resolver = ThresholdResolver::new(
            CountingStore::schema_only(88.0),
            Duration::from_secs(300),
        );

        let first = resolver.section_threshold("fsacr", "s1").await;
        let second = resolver.section_threshold("fsacr", "s1").await;

        // Both resolve to the schema-level section grade, and the confirmed
        // absence is remembered for the rest of the window.
        assert_eq!(first, 88.0);
        assert_eq!(second, 88.0);
        assert_eq!(resolver.store.section_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_drops_cached_section_grades() {
        let resolver = ThresholdResolver::new(
            CountingStore::returning(Some(90.0)),
            Duration::from_secs(300),
        );

        resolver.section_threshold("fsacr", "s1").await;
        resolver.invalidate("fsacr");
        resolver.section_threshold("fsacr", "s1").await;

        assert_eq!(resolver.store.section_calls.load(Ordering::SeqCst), 2);
    }
}

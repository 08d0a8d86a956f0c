//! Storage seam for experiments and raw events.
//!
//! The engine only ever talks to `dyn ExperimentStore`. `InMemoryStore`
//! backs tests, the CLI and local development; a database-backed
//! implementation plugs in behind the same trait.

use cartboost_core::error::{ExperimentError, ExperimentResult};
use cartboost_core::types::{
    EventCount, EventKind, Experiment, NewExperiment, TrackedEvent, Variant,
};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

/// Closed time window `[from, to]` applied to grouped event counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at <= self.to
    }
}

/// Experiments and events as seen by the engine.
pub trait ExperimentStore: Send + Sync {
    fn find_experiment_by_shop(&self, shop: &str) -> ExperimentResult<Option<Experiment>>;

    fn find_experiment(&self, id: &str) -> ExperimentResult<Option<Experiment>>;

    /// Persist a new experiment. Fails with `ExperimentError::Conflict` if
    /// the shop already owns one.
    fn create_experiment(&self, new: NewExperiment) -> ExperimentResult<Experiment>;

    /// Look up a variant together with the shop that owns it.
    fn find_variant(&self, variant_id: &str) -> ExperimentResult<Option<(Variant, String)>>;

    /// Event counts grouped by `(variant_id, kind)` for the given variants,
    /// in a single round trip.
    fn grouped_event_counts(
        &self,
        variant_ids: &[String],
        window: Option<TimeWindow>,
    ) -> ExperimentResult<Vec<EventCount>>;

    fn insert_event(&self, event: TrackedEvent) -> ExperimentResult<()>;

    /// Delete events created strictly before `cutoff`, returning how many.
    fn delete_events_before(&self, cutoff: DateTime<Utc>) -> ExperimentResult<u64>;
}

/// Generate a 25-char lowercase alphanumeric id.
pub fn new_record_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("c{}", &hex[..24])
}

/// Thread-safe in-memory store backed by DashMap.
pub struct InMemoryStore {
    experiments: DashMap<String, Experiment>,
    /// shop -> experiment id; the unique constraint on shop.
    shops: DashMap<String, String>,
    /// variant id -> experiment id
    variants: DashMap<String, String>,
    events: DashMap<u64, TrackedEvent>,
    next_event_id: AtomicU64,
    grouped_fetches: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        info!("Experiment store initialized (in-memory)");
        Self {
            experiments: DashMap::new(),
            shops: DashMap::new(),
            variants: DashMap::new(),
            events: DashMap::new(),
            next_event_id: AtomicU64::new(1),
            grouped_fetches: AtomicU64::new(0),
        }
    }

    /// Number of grouped count queries served so far.
    pub fn grouped_fetch_count(&self) -> u64 {
        self.grouped_fetches.load(Ordering::SeqCst)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Insert `count` events of `kind` for a variant at `at`.
    pub fn seed_events(&self, variant_id: &str, kind: EventKind, count: u64, at: DateTime<Utc>) {
        for _ in 0..count {
            let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
            self.events.insert(
                id,
                TrackedEvent {
                    variant_id: variant_id.to_string(),
                    kind: kind.clone(),
                    created_at: at,
                },
            );
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentStore for InMemoryStore {
    fn find_experiment_by_shop(&self, shop: &str) -> ExperimentResult<Option<Experiment>> {
        let Some(id) = self.shops.get(shop).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        self.find_experiment(&id)
    }

    fn find_experiment(&self, id: &str) -> ExperimentResult<Option<Experiment>> {
        Ok(self.experiments.get(id).map(|r| r.value().clone()))
    }

    fn create_experiment(&self, new: NewExperiment) -> ExperimentResult<Experiment> {
        // The shop entry stays locked until the experiment is fully inserted,
        // so a concurrent reader that sees the shop also sees its experiment.
        match self.shops.entry(new.shop.clone()) {
            Entry::Occupied(_) => Err(ExperimentError::Conflict(format!(
                "experiment already exists for shop {}",
                new.shop
            ))),
            Entry::Vacant(slot) => {
                let experiment = Experiment {
                    id: new_record_id(),
                    shop: new.shop,
                    name: new.name,
                    variants: new
                        .variants
                        .into_iter()
                        .map(|v| Variant {
                            id: new_record_id(),
                            name: v.name,
                            config: v.config,
                        })
                        .collect(),
                    created_at: Utc::now(),
                };
                for variant in &experiment.variants {
                    self.variants.insert(variant.id.clone(), experiment.id.clone());
                }
                self.experiments
                    .insert(experiment.id.clone(), experiment.clone());
                slot.insert(experiment.id.clone());
                debug!(shop = %experiment.shop, id = %experiment.id, "Experiment created");
                Ok(experiment)
            }
        }
    }

    fn find_variant(&self, variant_id: &str) -> ExperimentResult<Option<(Variant, String)>> {
        let Some(experiment_id) = self.variants.get(variant_id).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        let Some(experiment) = self.experiments.get(&experiment_id) else {
            return Ok(None);
        };
        let found = experiment
            .variants
            .iter()
            .find(|v| v.id == variant_id)
            .map(|v| (v.clone(), experiment.shop.clone()));
        Ok(found)
    }

    fn grouped_event_counts(
        &self,
        variant_ids: &[String],
        window: Option<TimeWindow>,
    ) -> ExperimentResult<Vec<EventCount>> {
        self.grouped_fetches.fetch_add(1, Ordering::SeqCst);

        let mut groups: HashMap<(String, EventKind), u64> = HashMap::new();
        for entry in self.events.iter() {
            let event = entry.value();
            if !variant_ids.contains(&event.variant_id) {
                continue;
            }
            if let Some(w) = window {
                if !w.contains(event.created_at) {
                    continue;
                }
            }
            *groups
                .entry((event.variant_id.clone(), event.kind.clone()))
                .or_insert(0) += 1;
        }

        Ok(groups
            .into_iter()
            .map(|((variant_id, kind), count)| EventCount {
                variant_id,
                kind,
                count,
            })
            .collect())
    }

    fn insert_event(&self, event: TrackedEvent) -> ExperimentResult<()> {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        self.events.insert(id, event);
        Ok(())
    }

    fn delete_events_before(&self, cutoff: DateTime<Utc>) -> ExperimentResult<u64> {
        let mut deleted = 0u64;
        self.events.retain(|_, event| {
            let keep = event.created_at >= cutoff;
            if !keep {
                deleted += 1;
            }
            keep
        });
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cartboost_core::types::{NewVariant, VariantConfig};
    use chrono::Duration;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    fn new_experiment(shop: &str) -> NewExperiment {
        NewExperiment {
            shop: shop.into(),
            name: "Test".into(),
            variants: vec![
                NewVariant {
                    name: "A".into(),
                    config: VariantConfig::new("#4CAF50", "a"),
                },
                NewVariant {
                    name: "B".into(),
                    config: VariantConfig::new("#2196F3", "b"),
                },
            ],
        }
    }

    #[test]
    fn test_record_id_shape() {
        let id = new_record_id();
        assert_eq!(id.len(), 25);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_create_and_find() {
        let store = InMemoryStore::new();
        let created = store.create_experiment(new_experiment("shop-1")).unwrap();
        assert_eq!(created.variants.len(), 2);
        assert_eq!(created.variants[0].name, "A");

        let by_shop = store.find_experiment_by_shop("shop-1").unwrap().unwrap();
        assert_eq!(by_shop.id, created.id);
        let by_id = store.find_experiment(&created.id).unwrap().unwrap();
        assert_eq!(by_id, created);

        let (variant, shop) = store.find_variant(&created.variants[1].id).unwrap().unwrap();
        assert_eq!(variant.name, "B");
        assert_eq!(shop, "shop-1");
    }

    #[test]
    fn test_unique_shop() {
        let store = InMemoryStore::new();
        store.create_experiment(new_experiment("shop-1")).unwrap();
        let err = store.create_experiment(new_experiment("shop-1")).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.experiment_count(), 1);
    }

    #[test]
    fn test_grouped_counts_and_window() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.seed_events("v-a", EventKind::Impression, 3, now);
        store.seed_events("v-a", EventKind::Impression, 2, now - Duration::days(10));
        store.seed_events("v-a", EventKind::AddToCart, 1, now);
        store.seed_events("v-z", EventKind::Impression, 9, now);

        let ids = vec!["v-a".to_string()];
        let mut all = store.grouped_event_counts(&ids, None).unwrap();
        all.sort_by(|a, b| a.kind.as_str().cmp(b.kind.as_str()));
        assert_eq!(
            all,
            vec![
                EventCount::new("v-a", EventKind::AddToCart, 1),
                EventCount::new("v-a", EventKind::Impression, 5),
            ]
        );

        let window = TimeWindow {
            from: now - Duration::days(1),
            to: now + Duration::seconds(1),
        };
        let recent = store.grouped_event_counts(&ids, Some(window)).unwrap();
        let impressions: u64 = recent
            .iter()
            .filter(|r| r.kind == EventKind::Impression)
            .map(|r| r.count)
            .sum();
        assert_eq!(impressions, 3);
        assert_eq!(store.grouped_fetch_count(), 2);
    }

    #[test]
    fn test_delete_events_before() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.seed_events("v-a", EventKind::Impression, 4, now - Duration::days(100));
        store.seed_events("v-a", EventKind::Impression, 2, now);
        let deleted = store.delete_events_before(now - Duration::days(90)).unwrap();
        assert_eq!(deleted, 4);
        assert_eq!(store.event_count(), 2);
    }

    #[test]
    fn test_delete_counts_with_concurrent_inserts() {
        let store = InMemoryStore::new();
        let stop = AtomicBool::new(false);
        let now = Utc::now();
        let cutoff = now - Duration::days(90);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while !stop.load(Ordering::Relaxed) {
                        store
                            .insert_event(TrackedEvent {
                                variant_id: "v-a".into(),
                                kind: EventKind::Impression,
                                created_at: now,
                            })
                            .unwrap();
                    }
                });
            }

            let deleted: Vec<u64> = (0..500)
                .map(|_| {
                    store.seed_events("v-a", EventKind::Impression, 2, now - Duration::days(100));
                    store.delete_events_before(cutoff).unwrap()
                })
                .collect();
            stop.store(true, Ordering::Relaxed);
            assert!(deleted.iter().all(|&n| n == 2), "{deleted:?}");
        });

        assert_eq!(store.delete_events_before(cutoff).unwrap(), 0);
    }
}

//! Per-variant statistics for a shop's A/B test.

use crate::aggregate::aggregate_event_counts;
use crate::bootstrap;
use crate::retention;
use crate::stats::{compute_confidence, compute_lift, compute_status, conversion_rate};
use crate::store::{ExperimentStore, TimeWindow};
use cartboost_core::config::{AppConfig, BootstrapConfig, TrackingConfig};
use cartboost_core::error::ExperimentResult;
use cartboost_core::types::{Experiment, Variant, VariantCounts, VariantStat};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Assemble one `VariantStat` per variant, preserving input order.
///
/// The control is the variant named "A". Without one, every variant is
/// compared against an empty baseline and lift/confidence stay at zero.
pub fn compute_variant_stats(
    variants: &[Variant],
    counts: &HashMap<String, VariantCounts>,
) -> Vec<VariantStat> {
    let counts_for = |variant: &Variant| counts.get(&variant.id).copied().unwrap_or_default();

    let control = variants
        .iter()
        .find(|v| v.is_control())
        .map(counts_for)
        .unwrap_or_default();
    let control_rate = if control.impressions > 0 {
        control.conversions as f64 / control.impressions as f64 * 100.0
    } else {
        0.0
    };

    variants
        .iter()
        .map(|variant| {
            let VariantCounts {
                impressions,
                conversions,
            } = counts_for(variant);
            let is_control = variant.is_control();

            let rate = conversion_rate(impressions, conversions);
            let lift = compute_lift(rate, control_rate, is_control);
            let confidence = if is_control {
                0.0
            } else {
                compute_confidence(
                    control.impressions,
                    control.conversions,
                    impressions,
                    conversions,
                )
            };

            VariantStat {
                id: variant.id.clone(),
                variant: variant.name.clone(),
                color: variant.color().to_string(),
                visitors: impressions,
                conversions,
                conversion_rate: rate,
                lift,
                confidence,
                status: compute_status(&variant.name, lift, confidence, impressions),
            }
        })
        .collect()
}

/// Facade over the store: experiment bootstrap, stats retrieval and the
/// retention sweep.
pub struct StatsEngine {
    store: Arc<dyn ExperimentStore>,
    bootstrap: BootstrapConfig,
    tracking: TrackingConfig,
}

impl StatsEngine {
    pub fn new(store: Arc<dyn ExperimentStore>) -> Self {
        Self::from_config(store, &AppConfig::default())
    }

    pub fn from_config(store: Arc<dyn ExperimentStore>, config: &AppConfig) -> Self {
        info!(
            retention_days = config.tracking.retention_days,
            "Stats engine initialized"
        );
        Self {
            store,
            bootstrap: config.bootstrap.clone(),
            tracking: config.tracking.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ExperimentStore> {
        &self.store
    }

    /// Fetch the shop's experiment, creating the default A/B/C test on first use.
    pub fn get_or_create_ab_test(&self, shop: &str) -> ExperimentResult<Experiment> {
        bootstrap::get_or_create_ab_test(self.store.as_ref(), shop, &self.bootstrap.test_name)
    }

    /// Stats for every variant of `test_id`, in variant order. Unknown
    /// tests yield an empty list.
    ///
    /// Issues exactly one grouped count query regardless of variant count.
    pub fn get_ab_test_stats(
        &self,
        test_id: &str,
        window: Option<TimeWindow>,
    ) -> ExperimentResult<Vec<VariantStat>> {
        let Some(experiment) = self.store.find_experiment(test_id)? else {
            debug!(test_id, "No experiment found");
            return Ok(Vec::new());
        };

        let variant_ids: Vec<String> = experiment.variants.iter().map(|v| v.id.clone()).collect();
        let rows = self.store.grouped_event_counts(&variant_ids, window)?;
        let counts = aggregate_event_counts(&variant_ids, &rows);
        let stats = compute_variant_stats(&experiment.variants, &counts);

        debug!(
            test_id,
            variants = stats.len(),
            rows = rows.len(),
            "Computed variant stats"
        );
        Ok(stats)
    }

    /// Delete raw events older than the configured retention period.
    pub fn purge_expired_events(&self, now: DateTime<Utc>) -> ExperimentResult<u64> {
        retention::purge_expired_events(self.store.as_ref(), self.tracking.retention_days, now)
    }
}

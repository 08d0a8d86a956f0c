//! First-use creation of a shop's A/B test.

use crate::store::ExperimentStore;
use cartboost_core::error::{ExperimentError, ExperimentResult};
use cartboost_core::types::{Experiment, NewExperiment, NewVariant, VariantConfig};
use tracing::{info, warn};

/// Variants every new shop starts with: name, color, bar copy.
pub const DEFAULT_VARIANTS: &[(&str, &str, &str)] = &[
    ("A", "#4CAF50", "Free shipping over $50"),
    ("B", "#2196F3", "Limited Time: Free Shipping!"),
    ("C", "#FF9800", "Get Free Shipping Today"),
];

pub fn default_experiment(shop: &str, test_name: &str) -> NewExperiment {
    NewExperiment {
        shop: shop.to_string(),
        name: test_name.to_string(),
        variants: DEFAULT_VARIANTS
            .iter()
            .map(|&(name, color, text)| NewVariant {
                name: name.to_string(),
                config: VariantConfig::new(color, text),
            })
            .collect(),
    }
}

/// Return the shop's experiment, creating the default one if none exists.
///
/// Two first-time callers can race on creation. The loser's create fails
/// and it re-reads once; if that read still finds nothing the original
/// failure is surfaced.
pub fn get_or_create_ab_test(
    store: &dyn ExperimentStore,
    shop: &str,
    test_name: &str,
) -> ExperimentResult<Experiment> {
    if let Some(existing) = store.find_experiment_by_shop(shop)? {
        return Ok(existing);
    }

    match store.create_experiment(default_experiment(shop, test_name)) {
        Ok(created) => {
            info!(shop, id = %created.id, "Created default A/B test");
            Ok(created)
        }
        Err(create_err) => {
            warn!(shop, error = %create_err, "Create failed, re-reading experiment");
            match store.find_experiment_by_shop(shop)? {
                Some(existing) => Ok(existing),
                None => Err(ExperimentError::Bootstrap(format!(
                    "no experiment for shop {shop} after failed create: {create_err}"
                ))),
            }
        }
    }
}

//! Validation and persistence of storefront tracking events.

use crate::store::ExperimentStore;
use cartboost_core::error::{ExperimentError, ExperimentResult};
use cartboost_core::types::{EventKind, TrackedEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Event types the storefront script may send.
pub const TRACKABLE_EVENT_TYPES: &[&str] = &["impression", "click", "add_to_cart", "conversion"];

const MIN_ID_LEN: usize = 20;
const MAX_ID_LEN: usize = 30;

/// Body of a tracking request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
}

/// Record ids are 20-30 lowercase alphanumerics.
pub fn is_valid_record_id(id: &str) -> bool {
    (MIN_ID_LEN..=MAX_ID_LEN).contains(&id.len())
        && id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Validate a tracking request for `shop` and store the event.
///
/// Nothing is written unless the shop is known, both fields are well
/// formed, and the variant belongs to that shop.
pub fn track_event(
    store: &dyn ExperimentStore,
    shop: Option<&str>,
    request: &TrackRequest,
    now: DateTime<Utc>,
) -> ExperimentResult<TrackedEvent> {
    let Some(shop) = shop.filter(|s| !s.is_empty()) else {
        return Err(ExperimentError::Unauthorized("missing shop".into()));
    };

    let variant_id = request
        .variant_id
        .as_deref()
        .filter(|id| is_valid_record_id(id))
        .ok_or_else(|| ExperimentError::Validation("Invalid variantId".into()))?;

    let event_type = request
        .event_type
        .as_deref()
        .filter(|t| TRACKABLE_EVENT_TYPES.contains(t))
        .ok_or_else(|| ExperimentError::Validation("Invalid event type".into()))?;

    match store.find_variant(variant_id)? {
        Some((_, owner)) if owner == shop => {}
        _ => return Err(ExperimentError::Validation("Invalid variantId".into())),
    }

    let event = TrackedEvent {
        variant_id: variant_id.to_string(),
        kind: EventKind::parse(event_type),
        created_at: now,
    };
    store.insert_event(event.clone())?;
    debug!(shop, variant_id, event_type, "Tracked event");
    Ok(event)
}

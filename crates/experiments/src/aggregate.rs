//! Folding grouped event rows into per-variant counts.

use cartboost_core::types::{EventCount, EventKind, VariantCounts};
use std::collections::HashMap;

/// Which counter a raw event kind feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountBucket {
    Impressions,
    Conversions,
}

/// Event kinds that count as a conversion. `add_to_cart` predates the
/// unified `conversion` event and is still emitted by older storefronts.
pub const CONVERSION_ALIASES: &[EventKind] = &[EventKind::Conversion, EventKind::AddToCart];

/// Resolve the bucket for an event kind, or `None` for kinds the engine
/// does not count (clicks, anything unknown).
pub fn bucket_for(kind: &EventKind) -> Option<CountBucket> {
    if *kind == EventKind::Impression {
        Some(CountBucket::Impressions)
    } else if CONVERSION_ALIASES.contains(kind) {
        Some(CountBucket::Conversions)
    } else {
        None
    }
}

/// Build the count map for `variant_ids` from one pass over `rows`.
///
/// Every requested id gets an entry, zeroed when no rows mention it.
/// Rows for ids outside the requested set are skipped.
pub fn aggregate_event_counts<S: AsRef<str>>(
    variant_ids: &[S],
    rows: &[EventCount],
) -> HashMap<String, VariantCounts> {
    let mut counts: HashMap<String, VariantCounts> = variant_ids
        .iter()
        .map(|id| (id.as_ref().to_string(), VariantCounts::default()))
        .collect();

    for row in rows {
        let Some(entry) = counts.get_mut(&row.variant_id) else {
            continue;
        };
        match bucket_for(&row.kind) {
            Some(CountBucket::Impressions) => entry.impressions += row.count,
            Some(CountBucket::Conversions) => entry.conversions += row.count,
            None => {}
        }
    }

    counts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_merge() {
        let rows = vec![
            EventCount::new("v-a", EventKind::Impression, 100),
            EventCount::new("v-a", EventKind::Conversion, 3),
            EventCount::new("v-a", EventKind::AddToCart, 2),
        ];
        let counts = aggregate_event_counts(&["v-a"], &rows);
        assert_eq!(counts["v-a"].impressions, 100);
        assert_eq!(counts["v-a"].conversions, 5);
    }

    #[test]
    fn test_missing_variants_are_zeroed() {
        let rows = vec![EventCount::new("v-a", EventKind::Impression, 6)];
        let counts = aggregate_event_counts(&["v-a", "v-b", "v-c"], &rows);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts["v-b"], VariantCounts::default());
        assert_eq!(counts["v-c"], VariantCounts::default());
    }

    #[test]
    fn test_unknown_kinds_ignored() {
        let rows = vec![
            EventCount::new("v-a", EventKind::Impression, 10),
            EventCount::new("v-a", EventKind::Click, 7),
            EventCount::new("v-a", EventKind::Other("checkout_started".into()), 4),
        ];
        let counts = aggregate_event_counts(&["v-a"], &rows);
        assert_eq!(counts["v-a"].impressions, 10);
        assert_eq!(counts["v-a"].conversions, 0);
    }

    #[test]
    fn test_split_rows_are_summed() {
        let rows = vec![
            EventCount::new("v-b", EventKind::Impression, 4),
            EventCount::new("v-b", EventKind::Impression, 6),
            EventCount::new("v-b", EventKind::Conversion, 1),
        ];
        let counts = aggregate_event_counts(&["v-b"], &rows);
        assert_eq!(counts["v-b"].impressions, 10);
        assert_eq!(counts["v-b"].conversions, 1);
    }

    #[test]
    fn test_foreign_variant_rows_skipped() {
        let rows = vec![EventCount::new("v-other", EventKind::Impression, 50)];
        let counts = aggregate_event_counts(&["v-a"], &rows);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["v-a"].impressions, 0);
    }

    #[test]
    fn test_bucket_for() {
        assert_eq!(bucket_for(&EventKind::Impression), Some(CountBucket::Impressions));
        assert_eq!(bucket_for(&EventKind::AddToCart), Some(CountBucket::Conversions));
        assert_eq!(bucket_for(&EventKind::Click), None);
    }
}

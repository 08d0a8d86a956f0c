//! Retention sweep for raw tracked events.

use crate::store::ExperimentStore;
use cartboost_core::error::ExperimentResult;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Delete raw events older than `retention_days` before `now`.
pub fn purge_expired_events(
    store: &dyn ExperimentStore,
    retention_days: u32,
    now: DateTime<Utc>,
) -> ExperimentResult<u64> {
    let cutoff = now - Duration::days(i64::from(retention_days));
    let deleted = store.delete_events_before(cutoff)?;
    info!(deleted, retention_days, %cutoff, "Purged expired events");
    Ok(deleted)
}

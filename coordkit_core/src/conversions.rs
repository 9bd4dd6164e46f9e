//! `From` implementations and helpers bridging `coordkit_config` types to `coordkit_core` types.

use std::time::Duration;

use coordkit_traits::{CrsDefinition, LocationFix};

use crate::crs::ConfigRegistry;
use crate::session::SessionConfig;

// ── SessionConfig ────────────────────────────────────────────────────────────

impl From<&coordkit_config::Sampling> for SessionConfig {
    fn from(s: &coordkit_config::Sampling) -> Self {
        Self {
            warmup: Duration::from_millis(s.warmup_ms),
            collection: Duration::from_millis(s.collection_ms),
            max_accuracy_m: s.max_accuracy_m,
            progress_interval: Duration::from_millis(s.progress_interval_ms),
            batch_size: s.batch_size,
            capture_interval: Duration::from_millis(s.capture_interval_ms),
            capture_timeout: Duration::from_millis(s.capture_timeout_ms),
            watch_timeout: Duration::from_millis(s.watch_timeout_ms),
            review: false,
        }
    }
}

// ── LocationFix ──────────────────────────────────────────────────────────────

pub fn fix_from_row(r: coordkit_config::FixtureRow) -> LocationFix {
    LocationFix::new(r.latitude, r.longitude, r.accuracy)
}

// ── CRS ──────────────────────────────────────────────────────────────────────

pub fn definition_from_entry(e: &coordkit_config::CrsEntry) -> CrsDefinition {
    CrsDefinition {
        code: e.code.clone(),
        name: e.name.clone(),
        kind: e.kind.clone(),
        projection_params: e.proj4.clone(),
    }
}

impl From<&coordkit_config::CrsCfg> for ConfigRegistry {
    fn from(c: &coordkit_config::CrsCfg) -> Self {
        Self::new(c.definitions.iter().map(definition_from_entry).collect())
    }
}

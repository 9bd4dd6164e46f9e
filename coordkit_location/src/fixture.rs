//! Replays a recorded list of fixes, e.g. loaded from CSV.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use coordkit_traits::{
    Clock, LocationError, LocationFix, LocationProvider, MonotonicClock, PositionCallback,
    PositionOptions, ProviderEvent, WatchCallback, WatchId,
};

use crate::error::{ProviderError, Result};
use crate::worker::Emitter;

/// Fixture-backed provider.
///
/// A watch emits every fix once, in order, one per `interval`, then the
/// optional trailing error, then goes quiet. Single-shot requests consume
/// the same list from their own cursor.
pub struct FixtureProvider {
    fixes: Arc<Vec<LocationFix>>,
    trailing_error: Option<LocationError>,
    interval: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
    next_id: u64,
    watches: HashMap<WatchId, Emitter>,
    single_cursor: usize,
}

impl FixtureProvider {
    pub fn new(fixes: Vec<LocationFix>, interval: Duration) -> Result<Self> {
        if fixes.is_empty() {
            return Err(ProviderError::EmptyFixture);
        }
        if interval.is_zero() {
            return Err(ProviderError::ZeroInterval);
        }
        Ok(Self {
            fixes: Arc::new(fixes),
            trailing_error: None,
            interval,
            clock: Arc::new(MonotonicClock::new()),
            next_id: 0,
            watches: HashMap::new(),
            single_cursor: 0,
        })
    }

    /// Emit `error` after the last fix.
    pub fn ending_with(mut self, error: LocationError) -> Self {
        self.trailing_error = Some(error);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }
}

impl LocationProvider for FixtureProvider {
    fn watch_position(
        &mut self,
        on_event: WatchCallback,
        _options: PositionOptions,
    ) -> std::result::Result<WatchId, LocationError> {
        self.next_id += 1;
        let id = WatchId(self.next_id);
        let fixes = self.fixes.clone();
        let mut trailing = self.trailing_error.clone();
        let mut cursor = 0usize;
        let emitter = Emitter::spawn(
            "coordkit-fixture",
            self.interval,
            self.clock.clone(),
            move || {
                if let Some(fix) = fixes.get(cursor) {
                    cursor += 1;
                    Some(ProviderEvent::Fix(*fix))
                } else {
                    trailing.take().map(ProviderEvent::Error)
                }
            },
            on_event,
        )
        .map_err(|e| LocationError::unavailable(format!("failed to start fixture replay: {e}")))?;
        tracing::debug!(watch = id.0, fixes = self.fixes.len(), "fixture watch started");
        self.watches.insert(id, emitter);
        Ok(id)
    }

    fn clear_watch(&mut self, id: WatchId) {
        if self.watches.remove(&id).is_some() {
            tracing::debug!(watch = id.0, "fixture watch cleared");
        }
    }

    fn get_current_position(&mut self, on_result: PositionCallback, _options: PositionOptions) {
        let result = match self.fixes.get(self.single_cursor) {
            Some(fix) => {
                self.single_cursor += 1;
                Ok(*fix)
            }
            None => Err(self
                .trailing_error
                .clone()
                .unwrap_or_else(|| LocationError::unavailable("fixture exhausted"))),
        };
        on_result(result);
    }
}

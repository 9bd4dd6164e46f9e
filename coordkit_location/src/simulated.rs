//! Built-in simulated receiver replaying a short recorded track.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use coordkit_traits::{
    Clock, LocationError, LocationFix, LocationProvider, MonotonicClock, PositionCallback,
    PositionOptions, ProviderEvent, WatchCallback, WatchId,
};

use crate::error::{ProviderError, Result};
use crate::now_ms;
use crate::worker::Emitter;

/// (latitude, longitude) of the recorded track.
pub const TRACK: [(f64, f64); 20] = [
    (-30.255_559_086_403_1, 135.421_626_482_112),
    (-30.255_560_286_403_1, 135.421_627_482_112),
    (-30.255_553_486_403_1, 135.421_606_582_112),
    (-30.255_525_886_403_1, 135.421_696_482_112),
    (-30.255_542_486_403_1, 135.421_686_782_112),
    (-30.255_542_886_403_1, 135.421_685_782_112),
    (-30.255_553_586_403_1, 135.421_676_882_112),
    (-30.255_553_686_403_1, 135.421_682_882_112),
    (-30.255_552_886_403_1, 135.421_683_382_112),
    (-30.255_525_286_403_1, 135.421_682_082_112),
    (-30.255_517_886_403_1, 135.421_683_482_112),
    (-30.255_517_386_403_1, 135.421_683_582_112),
    (-30.255_510_486_403_1, 135.421_684_282_112),
    (-30.255_509_386_403_1, 135.421_682_082_112),
    (-30.255_509_286_403_1, 135.421_681_882_112),
    (-30.255_507_086_403_1, 135.421_678_682_112),
    (-30.255_506_186_403_1, 135.421_678_182_112),
    (-30.255_506_086_403_1, 135.421_678_182_112),
    (-30.255_505_186_403_1, 135.421_677_182_112),
    (-30.255_504_286_403_1, 135.421_676_282_112),
];

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(800);

/// Accuracy reported for the `step`-th streamed fix (1-based): every third
/// fix is poor (15 m), the rest cycle through 3..=7 m.
pub fn streamed_accuracy(step: usize) -> f64 {
    if step % 3 == 0 {
        15.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let a = 3.0 + (step % 5) as f64;
        a
    }
}

/// Simulated receiver.
///
/// A watch streams [`TRACK`] (cycling) every `interval` with
/// [`streamed_accuracy`]. Single-shot requests answer immediately with the
/// next track point at accuracy 0.
pub struct SimulatedProvider {
    interval: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
    next_id: u64,
    watches: HashMap<WatchId, Emitter>,
    single_index: usize,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            clock: Arc::new(MonotonicClock::new()),
            next_id: 0,
            watches: HashMap::new(),
            single_index: 0,
        }
    }

    pub fn with_interval(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(ProviderError::ZeroInterval);
        }
        Ok(Self {
            interval,
            ..Self::new()
        })
    }

    /// Pace the stream with `clock` instead of real time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn track_fix(index: usize, accuracy: f64) -> LocationFix {
    let (lat, lon) = TRACK[index % TRACK.len()];
    LocationFix {
        latitude: lat,
        longitude: lon,
        accuracy,
        timestamp_ms: now_ms(),
    }
}

impl LocationProvider for SimulatedProvider {
    fn watch_position(
        &mut self,
        on_event: WatchCallback,
        _options: PositionOptions,
    ) -> std::result::Result<WatchId, LocationError> {
        self.next_id += 1;
        let id = WatchId(self.next_id);
        let mut index = 0usize;
        let emitter = Emitter::spawn(
            "coordkit-sim",
            self.interval,
            self.clock.clone(),
            move || {
                let fix = track_fix(index, streamed_accuracy(index + 1));
                index += 1;
                Some(ProviderEvent::Fix(fix))
            },
            on_event,
        )
        .map_err(|e| LocationError::unavailable(format!("failed to start simulator: {e}")))?;
        tracing::debug!(watch = id.0, interval = ?self.interval, "simulated watch started");
        self.watches.insert(id, emitter);
        Ok(id)
    }

    fn clear_watch(&mut self, id: WatchId) {
        if self.watches.remove(&id).is_some() {
            tracing::debug!(watch = id.0, "simulated watch cleared");
        }
    }

    fn get_current_position(&mut self, on_result: PositionCallback, _options: PositionOptions) {
        let fix = track_fix(self.single_index, 0.0);
        self.single_index = self.single_index.wrapping_add(1);
        on_result(Ok(fix));
    }
}

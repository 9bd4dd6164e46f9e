//! Location provider seam.
//!
//! Mirrors the shape of a device geolocation API: a long-lived watch that
//! pushes fixes and errors through a callback, and a single-shot request.
//! Callbacks may run on a provider-owned thread, so they are `Send`.

use std::fmt;
use std::time::Duration;

/// One raw location fix as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// 1-sigma horizontal radius in metres; smaller is better.
    pub accuracy: f64,
    /// Provider timestamp in milliseconds (provider-defined epoch).
    pub timestamp_ms: u64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp_ms: 0,
        }
    }
}

/// Failure classes a location subsystem can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl LocationErrorCode {
    /// Numeric code as used by browser geolocation (1, 2, 3).
    pub fn as_u8(self) -> u8 {
        match self {
            Self::PermissionDenied => 1,
            Self::PositionUnavailable => 2,
            Self::Timeout => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PermissionDenied",
            Self::PositionUnavailable => "PositionUnavailable",
            Self::Timeout => "Timeout",
        }
    }
}

/// Error reported by a location provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationError {
    pub code: LocationErrorCode,
    pub message: String,
}

impl LocationError {
    pub fn new(code: LocationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(LocationErrorCode::PermissionDenied, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(LocationErrorCode::PositionUnavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LocationErrorCode::Timeout, message)
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code.name())
    }
}

impl std::error::Error for LocationError {}

/// Request options for watches and single-shot requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub max_cache_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(10_000),
            max_cache_age: Duration::ZERO,
        }
    }
}

/// What a watch delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Fix(LocationFix),
    Error(LocationError),
}

/// Opaque watch handle returned by `watch_position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

pub type WatchCallback = Box<dyn FnMut(ProviderEvent) + Send>;
pub type PositionCallback = Box<dyn FnOnce(Result<LocationFix, LocationError>) + Send>;

pub trait LocationProvider {
    /// Start a long-lived subscription. Events flow into `on_event` until
    /// `clear_watch` is called with the returned id.
    fn watch_position(
        &mut self,
        on_event: WatchCallback,
        options: PositionOptions,
    ) -> Result<WatchId, LocationError>;

    /// Stop a subscription. Clearing an unknown or already-cleared id is a no-op.
    fn clear_watch(&mut self, id: WatchId);

    /// Request one fix. `on_result` is invoked exactly once.
    fn get_current_position(&mut self, on_result: PositionCallback, options: PositionOptions);
}

impl<P: LocationProvider + ?Sized> LocationProvider for Box<P> {
    fn watch_position(
        &mut self,
        on_event: WatchCallback,
        options: PositionOptions,
    ) -> Result<WatchId, LocationError> {
        (**self).watch_position(on_event, options)
    }

    fn clear_watch(&mut self, id: WatchId) {
        (**self).clear_watch(id);
    }

    fn get_current_position(&mut self, on_result: PositionCallback, options: PositionOptions) {
        (**self).get_current_position(on_result, options);
    }
}

pub mod clock;
pub mod crs;
pub mod location;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use crs::{CrsDefinition, CrsRegistry, CrsSummary};
pub use location::{
    LocationError, LocationErrorCode, LocationFix, LocationProvider, PositionCallback,
    PositionOptions, ProviderEvent, WatchCallback, WatchId,
};

/// Cartographic projection engine: maps `(x, y)` between two projection
/// definitions. Geographic coordinates are exchanged in degrees.
pub trait ProjectionEngine {
    fn project(
        &self,
        from_def: &str,
        to_def: &str,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64), Box<dyn std::error::Error + Send + Sync>>;
}

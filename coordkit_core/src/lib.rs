#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core coordinate logic (device-agnostic).
//!
//! All device and registry interactions go through the seams in
//! `coordkit_traits`: `LocationProvider`, `CrsRegistry`, `ProjectionEngine`
//! and `Clock`.
//!
//! ## Architecture
//!
//! - **Planar kernel**: bearing/distance projection on easting/northing (`planar`)
//! - **Transform**: validated CRS transforms through a projection engine (`transform`, `crs`)
//! - **Estimator**: inverse-squared-accuracy weighted average (`estimator`)
//! - **Session**: warm-up/collection state machine over a location watch (`session`, `timer`)
//! - **Runner**: blocking drivers for sessions and single-shot fixes (`runner`)
//! - **Records**: unique naming, identity and the record store (`naming`, `store`)

pub mod conversions;
pub mod crs;
pub mod error;
pub mod estimator;
pub mod mocks;
pub mod naming;
pub mod planar;
pub mod runner;
pub mod session;
pub mod store;
pub mod timer;
pub mod transform;
pub mod util;

pub use crate::crs::{BuiltinRegistry, ConfigRegistry, CrsCatalog, DEFAULT_CRS_CODE};
pub use crate::error::{CoordError, Result};
pub use crate::estimator::{WeightedPosition, compute_weighted_average};
pub use crate::naming::{derive_unique_name, generate_id, next_numeric_suggested_name};
pub use crate::planar::{
    BearingDistance, PlanarPoint, bearing_distance_between, project_from_bearing_distance,
};
pub use crate::session::{
    Phase, Progress, SamplingSession, SessionConfig, SessionEvent, SessionObserver,
    SessionOutcome,
};
pub use crate::store::{CoordinateRecord, Origin, RecordStore};
#[cfg(feature = "proj4")]
pub use crate::transform::Proj4Engine;
pub use crate::transform::transform_coordinate;

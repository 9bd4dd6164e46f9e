//! CRS transform adapter.
//!
//! Validates input, delegates to a `ProjectionEngine`, and turns engine
//! failures into `CoordError::TransformFailure`.

use crate::crs::CrsCatalog;
use crate::error::{CoordError, Result};
use coordkit_traits::{CrsRegistry, ProjectionEngine};
use eyre::WrapErr;

/// Transform `(x, y)` from `source_params` to `target_params`.
pub fn transform_coordinate<E: ProjectionEngine + ?Sized>(
    engine: &E,
    source_params: &str,
    target_params: &str,
    x: f64,
    y: f64,
) -> std::result::Result<(f64, f64), CoordError> {
    if !(x.is_finite() && y.is_finite()) {
        return Err(CoordError::InvalidArgument(
            "Invalid coordinates: x and y must be finite numbers.".into(),
        ));
    }
    let (x2, y2) = engine
        .project(source_params, target_params, x, y)
        .map_err(|e| CoordError::TransformFailure(e.to_string()))?;
    if !(x2.is_finite() && y2.is_finite()) {
        return Err(CoordError::TransformFailure(format!(
            "engine returned a non-finite coordinate ({x2}, {y2})"
        )));
    }
    tracing::debug!(x, y, x2, y2, "transformed coordinate");
    Ok((x2, y2))
}

/// Look up both CRS codes in `catalog` and transform between them.
pub fn transform_between<R, E>(
    catalog: &CrsCatalog<R>,
    engine: &E,
    from_code: &str,
    to_code: &str,
    x: f64,
    y: f64,
) -> Result<(f64, f64)>
where
    R: CrsRegistry,
    E: ProjectionEngine + ?Sized,
{
    let from = catalog.require(from_code)?;
    let to = catalog.require(to_code)?;
    transform_coordinate(engine, &from.projection_params, &to.projection_params, x, y)
        .map_err(eyre::Report::new)
        .wrap_err_with(|| format!("transform EPSG:{from_code} -> EPSG:{to_code}"))
}

#[cfg(feature = "proj4")]
pub use proj4::Proj4Engine;

#[cfg(feature = "proj4")]
mod proj4 {
    use coordkit_traits::ProjectionEngine;
    use proj4rs::proj::Proj;

    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    /// `ProjectionEngine` backed by `proj4rs`.
    ///
    /// Geographic definitions take and return degrees (lon, lat).
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Proj4Engine;

    impl Proj4Engine {
        pub fn new() -> Self {
            Self
        }
    }

    fn parse(def: &str) -> Result<Proj, BoxError> {
        Proj::from_proj_string(def)
            .map_err(|e| format!("invalid projection definition '{def}': {e}").into())
    }

    impl ProjectionEngine for Proj4Engine {
        fn project(
            &self,
            from_def: &str,
            to_def: &str,
            x: f64,
            y: f64,
        ) -> Result<(f64, f64), BoxError> {
            let src = parse(from_def)?;
            let dst = parse(to_def)?;
            let mut p = if src.is_latlong() {
                (x.to_radians(), y.to_radians(), 0.0)
            } else {
                (x, y, 0.0)
            };
            proj4rs::transform::transform(&src, &dst, &mut p)
                .map_err(|e| -> BoxError { format!("projection failed: {e}").into() })?;
            if dst.is_latlong() {
                Ok((p.0.to_degrees(), p.1.to_degrees()))
            } else {
                Ok((p.0, p.1))
            }
        }
    }
}

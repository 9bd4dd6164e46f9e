//! Coordinate reference system registry seam.

/// A CRS definition as served by a registry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsDefinition {
    pub code: String,
    pub name: String,
    /// Registry kind string, e.g. `CRS-GEOGCRS` or `CRS-PROJCRS`.
    pub kind: String,
    /// proj4-style projection parameters.
    pub projection_params: String,
}

impl CrsDefinition {
    /// Projected (easting/northing) rather than geographic (lon/lat).
    pub fn is_projected(&self) -> bool {
        self.kind.contains("PROJCRS")
    }

    /// Axis labels for display: (first, second).
    pub fn axis_labels(&self) -> (&'static str, &'static str) {
        if self.is_projected() {
            ("Easting", "Northing")
        } else {
            ("Longitude", "Latitude")
        }
    }

    pub fn summary(&self) -> CrsSummary {
        CrsSummary {
            code: self.code.clone(),
            name: self.name.clone(),
        }
    }
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsSummary {
    pub code: String,
    pub name: String,
}

impl CrsSummary {
    /// Display label, e.g. `WGS 84 (EPSG:4326)`.
    pub fn label(&self) -> String {
        format!("{} (EPSG:{})", self.name, self.code)
    }
}

/// Source of CRS definitions. Listing may be expensive; callers are expected
/// to cache (see `coordkit_core::crs::CrsCatalog`).
pub trait CrsRegistry {
    fn list_all(&self) -> Vec<CrsSummary>;
    fn load(&self, code: &str) -> Option<CrsDefinition>;
}

impl<R: CrsRegistry + ?Sized> CrsRegistry for Box<R> {
    fn list_all(&self) -> Vec<CrsSummary> {
        (**self).list_all()
    }

    fn load(&self, code: &str) -> Option<CrsDefinition> {
        (**self).load(code)
    }
}

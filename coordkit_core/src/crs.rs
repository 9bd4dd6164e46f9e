//! CRS catalog: builtin registry, config layering, load-once cache and
//! UTM helpers.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use coordkit_traits::{CrsDefinition, CrsRegistry, CrsSummary};

use crate::error::{CoordError, Result};

pub const DEFAULT_CRS_CODE: &str = "4326";
pub const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";

const GEOG: &str = "CRS-GEOGCRS";
const PROJ: &str = "CRS-PROJCRS";

// (code, name, kind, proj4)
const BUILTIN: &[(&str, &str, &str, &str)] = &[
    ("4326", "WGS 84", GEOG, WGS84_PROJ4),
    (
        "3857",
        "WGS 84 / Pseudo-Mercator",
        PROJ,
        "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
    ),
    (
        "27700",
        "OSGB36 / British National Grid",
        PROJ,
        "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs",
    ),
    (
        "32630",
        "WGS 84 / UTM zone 30N",
        PROJ,
        "+proj=utm +zone=30 +datum=WGS84 +units=m +no_defs",
    ),
    (
        "32631",
        "WGS 84 / UTM zone 31N",
        PROJ,
        "+proj=utm +zone=31 +datum=WGS84 +units=m +no_defs",
    ),
    (
        "32730",
        "WGS 84 / UTM zone 30S",
        PROJ,
        "+proj=utm +zone=30 +south +datum=WGS84 +units=m +no_defs",
    ),
    (
        "2154",
        "RGF93 v1 / Lambert-93",
        PROJ,
        "+proj=lcc +lat_0=46.5 +lon_0=3 +lat_1=49 +lat_2=44 +x_0=700000 +y_0=6600000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
    (
        "25832",
        "ETRS89 / UTM zone 32N",
        PROJ,
        "+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
    ("4979", "WGS 84 (3D)", GEOG, WGS84_PROJ4),
    (
        "7850",
        "GDA2020 / MGA zone 50",
        PROJ,
        "+proj=utm +zone=50 +south +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
];

fn builtin_definition(row: &(&str, &str, &str, &str)) -> CrsDefinition {
    CrsDefinition {
        code: row.0.to_string(),
        name: row.1.to_string(),
        kind: row.2.to_string(),
        projection_params: row.3.to_string(),
    }
}

/// Small static registry of commonly used codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinRegistry;

impl CrsRegistry for BuiltinRegistry {
    fn list_all(&self) -> Vec<CrsSummary> {
        BUILTIN
            .iter()
            .filter(|r| !r.3.is_empty())
            .map(|r| CrsSummary {
                code: r.0.to_string(),
                name: r.1.to_string(),
            })
            .collect()
    }

    fn load(&self, code: &str) -> Option<CrsDefinition> {
        BUILTIN
            .iter()
            .find(|r| r.0 == code)
            .map(builtin_definition)
    }
}

/// Extra definitions (from config) layered over the builtin registry.
/// Extra entries shadow builtin ones with the same code.
#[derive(Debug, Default, Clone)]
pub struct ConfigRegistry {
    extra: Vec<CrsDefinition>,
}

impl ConfigRegistry {
    pub fn new(extra: Vec<CrsDefinition>) -> Self {
        Self { extra }
    }
}

impl CrsRegistry for ConfigRegistry {
    fn list_all(&self) -> Vec<CrsSummary> {
        let mut out: Vec<CrsSummary> = self
            .extra
            .iter()
            .filter(|d| !d.projection_params.is_empty())
            .map(CrsDefinition::summary)
            .collect();
        for s in BuiltinRegistry.list_all() {
            if !out.iter().any(|o| o.code == s.code) {
                out.push(s);
            }
        }
        out
    }

    fn load(&self, code: &str) -> Option<CrsDefinition> {
        self.extra
            .iter()
            .find(|d| d.code == code)
            .cloned()
            .or_else(|| BuiltinRegistry.load(code))
    }
}

/// Caches a registry. The listing is fetched once on first use and never
/// refreshed; definitions are memoized per code.
pub struct CrsCatalog<R> {
    registry: R,
    listing: OnceLock<Vec<CrsSummary>>,
    definitions: Mutex<HashMap<String, CrsDefinition>>,
}

impl<R: CrsRegistry> CrsCatalog<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            listing: OnceLock::new(),
            definitions: Mutex::new(HashMap::new()),
        }
    }

    /// All known CRS, loaded on first call.
    pub fn list(&self) -> &[CrsSummary] {
        self.listing.get_or_init(|| {
            let all = self.registry.list_all();
            tracing::debug!(count = all.len(), "loaded CRS listing");
            all
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.listing.get().is_some()
    }

    /// Case-insensitive substring search over code and name.
    pub fn search(&self, needle: &str) -> Vec<CrsSummary> {
        let needle = needle.to_lowercase();
        self.list()
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.code.to_lowercase().contains(&needle)
                    || s.name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn definition(&self, code: &str) -> Option<CrsDefinition> {
        if let Ok(cache) = self.definitions.lock()
            && let Some(d) = cache.get(code)
        {
            return Some(d.clone());
        }
        let def = self.registry.load(code)?;
        if let Ok(mut cache) = self.definitions.lock() {
            cache.insert(code.to_string(), def.clone());
        }
        Some(def)
    }

    /// Like [`definition`](Self::definition) but a miss is `UnknownCrs`.
    pub fn require(&self, code: &str) -> Result<CrsDefinition> {
        self.definition(code)
            .ok_or_else(|| eyre::Report::new(CoordError::UnknownCrs(code.to_string())))
    }

    /// `"{name} (EPSG:{code})"`, or `"EPSG:{code}"` for unknown codes.
    pub fn label(&self, code: &str) -> String {
        self.list()
            .iter()
            .find(|s| s.code == code)
            .map(CrsSummary::label)
            .or_else(|| self.definition(code).map(|d| d.summary().label()))
            .unwrap_or_else(|| format!("EPSG:{code}"))
    }
}

/// UTM zone (1..=60) for a longitude in degrees.
pub fn utm_zone(longitude: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let z = (((longitude + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u8;
    z
}

pub fn utm_proj_string(zone: u8, south: bool) -> String {
    let south = if south { "+south " } else { "" };
    format!("+proj=utm +zone={zone} {south}+datum=WGS84 +units=m +no_defs")
}

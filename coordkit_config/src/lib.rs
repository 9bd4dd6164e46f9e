#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and location-fixture parsing for coordkit.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - The fixture CSV loader enforces exact headers and rejects rows with
//!   non-finite values so a replayed session never sees garbage.
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound for any configured phase duration (10 minutes).
pub const MAX_PHASE_MS: u64 = 600_000;

/// Location fixture CSV schema.
///
/// Expected headers:
/// latitude,longitude,accuracy
///
/// Example:
/// latitude,longitude,accuracy
/// -30.2555590864031,135.421626482112,4.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct FixtureRow {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Sampling {
    /// Warm-up window; fixes arriving here are ignored entirely.
    pub warmup_ms: u64,
    /// Collection window that follows the warm-up.
    pub collection_ms: u64,
    /// Fixes with a larger accuracy radius are discarded.
    pub max_accuracy_m: f64,
    /// How often progress is reported while no fixes arrive.
    pub progress_interval_ms: u64,
    /// Number of serial captures per extension batch.
    pub batch_size: usize,
    /// Delay between serial captures in an extension batch.
    pub capture_interval_ms: u64,
    /// Timeout for a single-shot capture.
    pub capture_timeout_ms: u64,
    /// Timeout hint passed with the continuous watch.
    pub watch_timeout_ms: u64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            warmup_ms: 30_000,
            collection_ms: 60_000,
            max_accuracy_m: 10.0,
            progress_interval_ms: 500,
            batch_size: 10,
            capture_interval_ms: 5_000,
            capture_timeout_ms: 10_000,
            watch_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Simulated,
    Fixture,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderCfg {
    /// "simulated" (built-in track) or "fixture" (CSV replay)
    pub kind: ProviderKind,
    /// Fixture CSV path; required when kind = "fixture"
    pub fixture: Option<PathBuf>,
    /// Delay between replayed fixes
    pub interval_ms: u64,
}

impl Default for ProviderCfg {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Simulated,
            fixture: None,
            interval_ms: 800,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CrsEntry {
    pub code: String,
    pub name: String,
    /// e.g. "CRS-PROJCRS" or "CRS-GEOGCRS"
    pub kind: String,
    pub proj4: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CrsCfg {
    /// CRS used when none is given on the command line
    pub default_code: String,
    /// Extra definitions layered over the builtin registry
    pub definitions: Vec<CrsEntry>,
}

impl Default for CrsCfg {
    fn default() -> Self {
        Self {
            default_code: "4326".to_string(),
            definitions: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub sampling: Sampling,
    pub provider: ProviderCfg,
    pub crs: CrsCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_fixture_csv(path: &Path) -> eyre::Result<Vec<FixtureRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open fixture CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["latitude", "longitude", "accuracy"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "fixture CSV must have headers 'latitude,longitude,accuracy', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<FixtureRow>().enumerate() {
        match rec {
            Ok(row) => {
                if !(row.latitude.is_finite() && row.longitude.is_finite()) {
                    eyre::bail!("fixture row {} has a non-finite coordinate", idx + 2);
                }
                if row.accuracy.is_nan() || row.accuracy < 0.0 {
                    eyre::bail!("fixture row {} has an invalid accuracy", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("fixture CSV {:?} contains no rows", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sampling
        let s = &self.sampling;
        if s.warmup_ms > MAX_PHASE_MS {
            eyre::bail!("sampling.warmup_ms must be <= {MAX_PHASE_MS}");
        }
        if s.collection_ms == 0 {
            eyre::bail!("sampling.collection_ms must be >= 1");
        }
        if s.collection_ms > MAX_PHASE_MS {
            eyre::bail!("sampling.collection_ms must be <= {MAX_PHASE_MS}");
        }
        if !(s.max_accuracy_m.is_finite() && s.max_accuracy_m > 0.0) {
            eyre::bail!("sampling.max_accuracy_m must be a finite value > 0");
        }
        if s.progress_interval_ms == 0 {
            eyre::bail!("sampling.progress_interval_ms must be >= 1");
        }
        if s.batch_size == 0 {
            eyre::bail!("sampling.batch_size must be >= 1");
        }
        if s.capture_interval_ms > MAX_PHASE_MS {
            eyre::bail!("sampling.capture_interval_ms must be <= {MAX_PHASE_MS}");
        }
        if s.capture_timeout_ms == 0 {
            eyre::bail!("sampling.capture_timeout_ms must be >= 1");
        }
        if s.watch_timeout_ms == 0 {
            eyre::bail!("sampling.watch_timeout_ms must be >= 1");
        }

        // Provider
        if self.provider.interval_ms == 0 {
            eyre::bail!("provider.interval_ms must be >= 1");
        }
        if self.provider.kind == ProviderKind::Fixture && self.provider.fixture.is_none() {
            eyre::bail!("provider.fixture is required when provider.kind = \"fixture\"");
        }

        // CRS
        if self.crs.default_code.trim().is_empty() {
            eyre::bail!("crs.default_code must not be empty");
        }
        let mut seen = std::collections::HashSet::new();
        for d in &self.crs.definitions {
            if d.code.trim().is_empty() {
                eyre::bail!("crs.definitions entries must have a non-empty code");
            }
            if d.proj4.trim().is_empty() {
                eyre::bail!("crs.definitions[{}].proj4 must not be empty", d.code);
            }
            if !seen.insert(d.code.as_str()) {
                eyre::bail!("crs.definitions has duplicate code {}", d.code);
            }
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

//! Loaded configuration plus the long-lived pieces commands share.

use std::path::{Path, PathBuf};
use std::time::Duration;

use coordkit_config::{Config, ProviderKind, load_fixture_csv, load_toml};
use coordkit_core::conversions::fix_from_row;
use coordkit_core::{ConfigRegistry, CrsCatalog, Proj4Engine};
use coordkit_location::{FixtureProvider, SimulatedProvider};
use coordkit_traits::{LocationFix, LocationProvider};
use eyre::WrapErr;

use crate::cli::DEFAULT_CONFIG_PATH;

pub struct App {
    pub cfg: Config,
    pub json: bool,
    pub catalog: CrsCatalog<ConfigRegistry>,
    pub engine: Proj4Engine,
}

impl App {
    pub fn new(cfg: Config, json: bool) -> Self {
        let catalog = CrsCatalog::new(ConfigRegistry::from(&cfg.crs));
        Self {
            cfg,
            json,
            catalog,
            engine: Proj4Engine::new(),
        }
    }

    /// Provider for `locate`/`average`. `fixture` overrides `[provider]`.
    pub fn provider(&self, fixture: Option<&Path>) -> eyre::Result<Box<dyn LocationProvider>> {
        let interval = Duration::from_millis(self.cfg.provider.interval_ms);
        let path = match (fixture, self.cfg.provider.kind) {
            (Some(p), _) => Some(p.to_path_buf()),
            (None, ProviderKind::Fixture) => self.cfg.provider.fixture.clone(),
            (None, ProviderKind::Simulated) => None,
        };
        if let Some(path) = path {
            let fixes: Vec<LocationFix> = load_fixture_csv(&path)?
                .into_iter()
                .map(fix_from_row)
                .collect();
            tracing::info!(path = ?path, fixes = fixes.len(), "replaying fixture");
            let provider = FixtureProvider::new(fixes, interval)
                .wrap_err_with(|| format!("fixture provider for {path:?}"))?;
            return Ok(Box::new(provider));
        }
        tracing::info!(interval_ms = self.cfg.provider.interval_ms, "using simulated provider");
        Ok(Box::new(
            SimulatedProvider::with_interval(interval).wrap_err("simulated provider")?,
        ))
    }
}

/// Read and validate the config. A missing default file means built-in defaults;
/// a missing explicit `--config` is an error.
pub fn load_config(explicit: Option<&Path>) -> eyre::Result<Config> {
    let path = explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf);
    let cfg = match std::fs::read_to_string(&path) {
        Ok(text) => load_toml(&text).wrap_err_with(|| format!("parse config {path:?}"))?,
        Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
            Config::default()
        }
        Err(e) => return Err(e).wrap_err_with(|| format!("read config {path:?}")),
    };
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {path:?}"))?;
    Ok(cfg)
}

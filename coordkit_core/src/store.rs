//! In-memory, insertion-ordered set of named coordinate records.
//!
//! Names are unique among live records at all times; ids never change and
//! are never reused. Derived records (transform, project) are appended as
//! new entries and never overwrite their source.

use std::collections::HashSet;

use coordkit_traits::{CrsRegistry, ProjectionEngine};
use serde::Serialize;

use crate::crs::CrsCatalog;
use crate::error::{CoordError, Report, Result};
use crate::naming::{RecordId, derive_unique_name, generate_id, next_numeric_suggested_name};
use crate::planar::{BearingDistance, bearing_distance_between, project_from_bearing_distance};
use crate::session::SessionOutcome;
use crate::transform::transform_between;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Manual,
    Projected,
    Transformed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateRecord {
    pub id: RecordId,
    pub name: String,
    pub crs_code: String,
    pub x: f64,
    pub y: f64,
    pub origin: Origin,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: Vec<CoordinateRecord>,
}

fn non_empty(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn not_found(id: &str) -> Report {
    Report::new(CoordError::RecordNotFound(id.to_string()))
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[CoordinateRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&CoordinateRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&CoordinateRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn names_except(&self, skip_id: Option<&str>) -> HashSet<String> {
        self.records
            .iter()
            .filter(|r| Some(r.id.as_str()) != skip_id)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Next free numeric name, e.g. `"3"` after `"1"` and `"2"`.
    pub fn suggested_name(&self) -> String {
        next_numeric_suggested_name(self.records.iter().map(|r| r.name.as_str()))
    }

    fn push(
        &mut self,
        name: String,
        crs_code: &str,
        (x, y): (f64, f64),
        origin: Origin,
        notes: Option<String>,
    ) -> CoordinateRecord {
        let record = CoordinateRecord {
            id: generate_id(),
            name,
            crs_code: crs_code.to_string(),
            x,
            y,
            origin,
            notes,
        };
        tracing::debug!(id = %record.id, name = %record.name, origin = ?origin, "record added");
        self.records.push(record.clone());
        record
    }

    pub fn add_manual(
        &mut self,
        crs_code: &str,
        x: f64,
        y: f64,
        name: Option<&str>,
        notes: Option<&str>,
    ) -> Result<CoordinateRecord> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(Report::new(CoordError::InvalidArgument(
                "Invalid coordinates: x and y must be finite numbers.".into(),
            )));
        }
        let name = match name {
            Some(n) => derive_unique_name(&self.names_except(None), n),
            None => self.suggested_name(),
        };
        Ok(self.push(name, crs_code, (x, y), Origin::Manual, non_empty(notes)))
    }

    /// Store a sampling result as lon/lat (`x` = longitude, `y` = latitude).
    pub fn add_from_estimate(
        &mut self,
        crs_code: &str,
        outcome: &SessionOutcome,
        name: Option<&str>,
    ) -> Result<CoordinateRecord> {
        let notes = format!(
            "GPS average of {} samples ({} discarded) over {:.0} s",
            outcome.samples_used,
            outcome.samples_discarded,
            outcome.duration.as_secs_f64()
        );
        self.add_manual(
            crs_code,
            outcome.longitude,
            outcome.latitude,
            name,
            Some(&notes),
        )
    }

    /// Transform record `id` into `target_code`, appended as `{name}_Transform`.
    pub fn transform_record<R, E>(
        &mut self,
        id: &str,
        target_code: &str,
        catalog: &CrsCatalog<R>,
        engine: &E,
    ) -> Result<CoordinateRecord>
    where
        R: CrsRegistry,
        E: ProjectionEngine + ?Sized,
    {
        let src = self.records[self.index_of(id)?].clone();
        let xy = transform_between(catalog, engine, &src.crs_code, target_code, src.x, src.y)?;
        let name = derive_unique_name(
            &self.names_except(None),
            &format!("{}_Transform", src.name),
        );
        Ok(self.push(name, target_code, xy, Origin::Transformed, None))
    }

    /// Project from record `id`, appended as `{name}_Project` in the same CRS.
    pub fn project_record(
        &mut self,
        id: &str,
        bearing_deg: f64,
        distance: f64,
    ) -> Result<CoordinateRecord> {
        let src = self.records[self.index_of(id)?].clone();
        let p = project_from_bearing_distance(src.x, src.y, bearing_deg, distance)
            .map_err(Report::new)?;
        let name = derive_unique_name(&self.names_except(None), &format!("{}_Project", src.name));
        let notes = format!(
            "Projected from {}: bearing {bearing_deg:.1}°, distance {distance:.2} units",
            src.name
        );
        Ok(self.push(
            name,
            &src.crs_code,
            (p.easting, p.northing),
            Origin::Projected,
            Some(notes),
        ))
    }

    /// Bearing and distance from `source_id` to `target_id`; the result is
    /// also appended to the source record's notes.
    pub fn find_bearing(&mut self, source_id: &str, target_id: &str) -> Result<BearingDistance> {
        let si = self.index_of(source_id)?;
        let ti = self.index_of(target_id)?;
        let (src, dst) = (&self.records[si], &self.records[ti]);
        if src.crs_code != dst.crs_code {
            return Err(Report::new(CoordError::InvalidArgument(format!(
                "records must share a CRS (EPSG:{} vs EPSG:{})",
                src.crs_code, dst.crs_code
            ))));
        }
        let bd = bearing_distance_between(src.x, src.y, dst.x, dst.y).map_err(Report::new)?;
        let line = format!(
            "Bearing to {}: {:.1}°, distance: {:.2} units",
            dst.name, bd.bearing_deg, bd.distance
        );
        let src = &mut self.records[si];
        src.notes = Some(match src.notes.as_deref().map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line,
        });
        Ok(bd)
    }

    /// Rename, keeping the id. Uniqueness ignores the record's own name.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<String> {
        let i = self.index_of(id)?;
        let name = derive_unique_name(&self.names_except(Some(id)), new_name);
        self.records[i].name.clone_from(&name);
        Ok(name)
    }

    pub fn update_note(&mut self, id: &str, notes: Option<&str>) -> Result<()> {
        let i = self.index_of(id)?;
        self.records[i].notes = non_empty(notes);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<CoordinateRecord> {
        let i = self.index_of(id)?;
        Ok(self.records.remove(i))
    }

    pub fn reset(&mut self) {
        tracing::debug!(count = self.records.len(), "record store reset");
        self.records.clear();
    }
}

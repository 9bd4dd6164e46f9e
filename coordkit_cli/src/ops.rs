//! One-shot commands: planar math, transforms, catalog browsing, single fixes.

use coordkit_core::crs::{WGS84_PROJ4, utm_proj_string, utm_zone};
use coordkit_core::runner::current_position;
use coordkit_core::{CoordinateRecord, RecordStore, transform_coordinate};
use coordkit_traits::{CrsDefinition, PositionOptions};
use serde_json::json;
use std::time::Duration;

use crate::app::App;

/// Print `value` as one JSON line, or the human rendering.
pub fn emit(app: &App, value: &serde_json::Value, human: impl FnOnce() -> String) {
    if app.json {
        println!("{value}");
    } else {
        println!("{}", human());
    }
}

pub fn record_json(app: &App, r: &CoordinateRecord) -> serde_json::Value {
    let mut v = serde_json::to_value(r).unwrap_or_else(|_| json!({}));
    v["crs_label"] = json!(app.catalog.label(&r.crs_code));
    v
}

fn fmt_xy(def: Option<&CrsDefinition>, x: f64, y: f64) -> String {
    match def {
        Some(d) if !d.is_projected() => {
            let (a, b) = d.axis_labels();
            format!("{a}: {x:.8}\n{b}: {y:.8}")
        }
        Some(d) => {
            let (a, b) = d.axis_labels();
            format!("{a}: {x:.3}\n{b}: {y:.3}")
        }
        None => format!("X: {x:.3}\nY: {y:.3}"),
    }
}

pub fn render_record(app: &App, r: &CoordinateRecord) -> String {
    let def = app.catalog.definition(&r.crs_code);
    let mut out = format!(
        "{} [{}]\nCRS: {}\n{}",
        r.name,
        r.id,
        app.catalog.label(&r.crs_code),
        fmt_xy(def.as_ref(), r.x, r.y)
    );
    if let Some(notes) = &r.notes {
        out.push_str("\nNotes: ");
        out.push_str(notes);
    }
    out
}

pub fn project(
    app: &App,
    easting: f64,
    northing: f64,
    bearing: f64,
    distance: f64,
    crs: Option<&str>,
) -> eyre::Result<()> {
    let code = crs.unwrap_or(&app.cfg.crs.default_code);
    let mut store = RecordStore::new();
    let start = store.add_manual(code, easting, northing, Some("Start"), None)?;
    let projected = store.project_record(&start.id, bearing, distance)?;
    emit(app, &record_json(app, &projected), || {
        render_record(app, &projected)
    });
    Ok(())
}

pub fn bearing(
    app: &App,
    from: (f64, f64),
    to: (f64, f64),
) -> eyre::Result<()> {
    let code = app.cfg.crs.default_code.as_str();
    let mut store = RecordStore::new();
    let a = store.add_manual(code, from.0, from.1, Some("From"), None)?;
    let b = store.add_manual(code, to.0, to.1, Some("To"), None)?;
    let bd = store.find_bearing(&a.id, &b.id)?;
    emit(app, &json!(bd), || {
        format!("Bearing: {:.1}°\nDistance: {:.2} units", bd.bearing_deg, bd.distance)
    });
    Ok(())
}

pub fn transform(app: &App, from: &str, to: &str, x: f64, y: f64) -> eyre::Result<()> {
    let mut store = RecordStore::new();
    let src = store.add_manual(from, x, y, Some("Point"), None)?;
    let out = store.transform_record(&src.id, to, &app.catalog, &app.engine)?;
    emit(app, &record_json(app, &out), || render_record(app, &out));
    Ok(())
}

pub fn crs_list(app: &App, filter: Option<&str>) -> eyre::Result<()> {
    let hits = app.catalog.search(filter.unwrap_or(""));
    let value = json!(
        hits.iter()
            .map(|s| json!({ "code": s.code, "name": s.name }))
            .collect::<Vec<_>>()
    );
    emit(app, &value, || {
        if hits.is_empty() {
            return "No matching CRS.".to_string();
        }
        hits.iter()
            .map(|s| format!("{:>6}  {}", s.code, s.name))
            .collect::<Vec<_>>()
            .join("\n")
    });
    Ok(())
}

pub fn crs_show(app: &App, code: &str) -> eyre::Result<()> {
    let def = app.catalog.require(code)?;
    let (a, b) = def.axis_labels();
    let value = json!({
        "code": def.code,
        "name": def.name,
        "kind": def.kind,
        "proj4": def.projection_params,
        "projected": def.is_projected(),
        "axes": [a, b],
    });
    emit(app, &value, || {
        format!(
            "{}\nKind: {}\nAxes: {a}, {b}\nproj4: {}",
            def.summary().label(),
            def.kind,
            def.projection_params
        )
    });
    Ok(())
}

pub fn locate(app: &App) -> eyre::Result<()> {
    let mut provider = app.provider(None)?;
    let options = PositionOptions {
        timeout: Duration::from_millis(app.cfg.sampling.capture_timeout_ms),
        ..PositionOptions::default()
    };
    let fix = current_position(&mut provider, options)?;

    let zone = utm_zone(fix.longitude);
    let south = fix.latitude < 0.0;
    let (easting, northing) = transform_coordinate(
        &app.engine,
        WGS84_PROJ4,
        &utm_proj_string(zone, south),
        fix.longitude,
        fix.latitude,
    )?;
    let hemisphere = if south { "S" } else { "N" };

    let value = json!({
        "latitude": fix.latitude,
        "longitude": fix.longitude,
        "accuracy": fix.accuracy,
        "timestamp_ms": fix.timestamp_ms,
        "utm": { "zone": zone, "hemisphere": hemisphere, "easting": easting, "northing": northing },
    });
    emit(app, &value, || {
        format!(
            "Latitude: {:.8}\nLongitude: {:.8}\nAccuracy: ±{:.1} m\nUTM {zone}{hemisphere}: {easting:.3} E, {northing:.3} N",
            fix.latitude, fix.longitude, fix.accuracy
        )
    });
    Ok(())
}

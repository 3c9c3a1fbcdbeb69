//! Output formatting and persistence.
//!
//! Supports pretty-printed JSON on stdout, GeoJSON point data, CSV append of
//! annotated readings and writing encoded tiles.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::reading::AnnotatedReading;
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Prints any serializable value as pretty JSON on stdout.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// GeoJSON `FeatureCollection` with one Point per annotated reading.
pub fn to_geojson(readings: &[AnnotatedReading]) -> Value {
    let features: Vec<Value> = readings
        .iter()
        .map(|r| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [r.longitude, r.latitude],
                },
                "properties": {
                    "pm10": r.pm10,
                    "aqi": r.aqi,
                    "aqi_category": r.category,
                    "aqi_color": r.color,
                    "time": r.time,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "generated_at": chrono::Utc::now(),
        "features": features,
    })
}

/// Appends annotated readings as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &Path, readings: &[AnnotatedReading]) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = readings.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // header only on first write
        .from_writer(file);

    for reading in readings {
        writer.serialize(reading)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes bytes to `path`, creating parent directories.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "File written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::AqiCategory;
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn sample() -> AnnotatedReading {
        AnnotatedReading {
            latitude: 0.35,
            longitude: 32.58,
            pm10: 100.0,
            aqi: 73,
            category: AqiCategory::Moderate,
            color: "#FFFF00".to_string(),
            time: None,
        }
    }

    #[test]
    fn test_geojson_shape() {
        let geojson = to_geojson(&[sample()]);

        assert_eq!(geojson["type"], "FeatureCollection");
        let feature = &geojson["features"][0];
        assert_eq!(feature["geometry"]["coordinates"][0], 32.58);
        assert_eq!(feature["geometry"]["coordinates"][1], 0.35);
        assert_eq!(feature["properties"]["aqi"], 73);
        assert_eq!(feature["properties"]["aqi_category"], "Moderate");
        assert!(feature["properties"]["time"].is_null());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&sample()).unwrap();
    }

    #[test]
    fn test_append_records_writes_header_once() {
        let path = temp_path("aqi_tiles_test_header.csv");
        let _ = fs::remove_file(&path);

        append_records(&path, &[sample()]).unwrap();
        append_records(&path, &[sample(), sample()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("latitude")).count();
        assert_eq!(header_count, 1);
        // 1 header + 3 data rows
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains("Moderate"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_file_creates_parent_dirs() {
        let dir = temp_path("aqi_tiles_test_tiles");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("3/4/2.pbf");

        write_file(&path, &[1, 2, 3]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);

        fs::remove_dir_all(&dir).unwrap();
    }
}

//! Renders site readings as a point layer of one tile.

use tracing::{debug, info};

use super::annotate::{AnnotationReport, OutputKeys};
use super::value::{TagTable, double_value, string_value};
use super::TileError;
use crate::aqi::AqiConverter;
use crate::geo::TileId;
use crate::reading::SiteReading;
use crate::vector_tile::Tile;
use crate::vector_tile::tile::{Feature, GeomType, Layer};

const MOVE_TO: u32 = 1;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub layer_name: String,
    pub extent: u32,
    /// Points this far outside the tile (in tile units) are still included
    /// so symbols are not clipped at tile edges.
    pub buffer: u32,
    pub strict: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            layer_name: "aqi".to_string(),
            extent: 4096,
            buffer: 64,
            strict: false,
        }
    }
}

fn zigzag(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

fn command(id: u32, count: u32) -> u32 {
    (id & 0x7) | (count << 3)
}

/// Geometry of a single POINT feature.
pub fn point_geometry(x: i32, y: i32) -> Vec<u32> {
    vec![command(MOVE_TO, 1), zigzag(x), zigzag(y)]
}

/// Builds a one-layer tile with a POINT feature per reading inside `tile_id`.
///
/// Readings with an invalid latitude or outside the buffered tile are not
/// considered. Each feature carries `pm10`, `aqi`, `aqi_category`,
/// `aqi_color` and, when known, `time`.
///
/// # Errors
///
/// In strict mode, [`TileError::Feature`] for the first reading whose pm10
/// value cannot be converted.
pub fn render_points(
    readings: &[SiteReading],
    tile_id: TileId,
    converter: &AqiConverter,
    options: &RenderOptions,
) -> Result<(Tile, AnnotationReport), TileError> {
    let mut layer = Layer {
        name: options.layer_name.clone(),
        extent: Some(options.extent),
        ..Default::default()
    };
    let mut table = TagTable::default();
    let mut report = AnnotationReport {
        layers: 1,
        ..Default::default()
    };

    let low = -i64::from(options.buffer);
    let high = i64::from(options.extent) + i64::from(options.buffer);
    let mut outside = 0usize;

    for (index, reading) in readings.iter().enumerate() {
        let Some((lat, lon)) = reading.position() else {
            outside += 1;
            continue;
        };
        let (x, y) = tile_id.project(lon, lat, options.extent);
        if !(low..high).contains(&x) || !(low..high).contains(&y) {
            outside += 1;
            continue;
        }
        report.features += 1;

        let (pm10, result) = match reading
            .concentration()
            .and_then(|c| converter.convert_concentration(c).map(|r| (c, r)))
        {
            Ok(converted) => converted,
            Err(source) if options.strict => {
                return Err(TileError::Feature {
                    layer: layer.name.clone(),
                    feature: index,
                    source,
                });
            }
            Err(e) => {
                debug!(row = index, error = %e, "Reading skipped");
                report.skipped += 1;
                continue;
            }
        };

        let mut feature = Feature {
            id: Some(index as u64 + 1),
            geometry: point_geometry(x as i32, y as i32),
            ..Default::default()
        };
        feature.set_type(GeomType::Point);

        let pm10_key = table.key(&mut layer.keys, "pm10");
        let pm10_value = table.value(&mut layer.values, double_value(pm10.value()));
        feature.tags.extend([pm10_key, pm10_value]);

        if let Some(time) = reading.time {
            let time_key = table.key(&mut layer.keys, "time");
            let time_value = table.value(&mut layer.values, string_value(time.to_rfc3339()));
            feature.tags.extend([time_key, time_value]);
        }

        OutputKeys::intern(&mut table, &mut layer.keys).apply(
            &mut feature,
            &mut table,
            &mut layer.values,
            result,
        );
        layer.features.push(feature);
        report.record(result);
    }

    info!(
        tile = %tile_id,
        features = report.features,
        annotated = report.annotated,
        skipped = report.skipped,
        outside,
        "Point layer rendered"
    );

    Ok((
        Tile {
            layers: vec![layer],
        },
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::value::feature_property;
    use crate::tile::{AQI_KEY, CATEGORY_KEY};
    use chrono::{TimeZone, Utc};

    fn reading(lat: f64, lon: f64, pm10: &str) -> SiteReading {
        SiteReading {
            latitude: lat,
            longitude: lon,
            pm10: Some(pm10.to_string()),
            time: None,
        }
    }

    fn unzigzag(n: u32) -> i32 {
        ((n >> 1) as i32) ^ -((n & 1) as i32)
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(zigzag(-2), 3);
        assert_eq!(unzigzag(zigzag(-2048)), -2048);
    }

    #[test]
    fn test_point_geometry() {
        assert_eq!(point_geometry(25, 17), vec![9, 50, 34]);
    }

    #[test]
    fn test_render_world_tile() {
        let readings = vec![reading(0.0, 0.0, "100"), reading(10.0, 370.0, "20")];
        let tile_id = TileId::new(0, 0, 0).unwrap();

        let (tile, report) =
            render_points(&readings, tile_id, &AqiConverter::pm10(), &RenderOptions::default())
                .unwrap();

        assert_eq!(report.features, 2);
        assert_eq!(report.annotated, 2);

        let layer = &tile.layers[0];
        assert_eq!(layer.name, "aqi");
        assert_eq!(layer.extent(), 4096);
        assert_eq!(layer.features.len(), 2);

        let first = &layer.features[0];
        assert_eq!(first.r#type(), GeomType::Point);
        assert_eq!(first.geometry[0], 9);
        assert_eq!(unzigzag(first.geometry[1]), 2048);
        assert_eq!(unzigzag(first.geometry[2]), 2048);

        let aqi = feature_property(first, &layer.keys, &layer.values, AQI_KEY).unwrap();
        assert_eq!(aqi.uint_value, Some(73));
        let pm10 = feature_property(first, &layer.keys, &layer.values, "pm10").unwrap();
        assert_eq!(pm10.double_value, Some(100.0));

        // 370° wraps to 10°.
        let second = &layer.features[1];
        assert!(unzigzag(second.geometry[1]) > 2048);
        let category = feature_property(second, &layer.keys, &layer.values, CATEGORY_KEY).unwrap();
        assert_eq!(category.string_value.as_deref(), Some("Good"));
    }

    #[test]
    fn test_render_drops_points_outside_tile() {
        let readings = vec![
            reading(0.35, 32.58, "40"),
            reading(48.85, 2.35, "40"),
            reading(95.0, 0.0, "40"),
        ];
        // Zoom 4 tile containing Kampala.
        let tile_id = TileId::new(4, 9, 7).unwrap();

        let (tile, report) =
            render_points(&readings, tile_id, &AqiConverter::pm10(), &RenderOptions::default())
                .unwrap();

        assert_eq!(report.features, 1);
        assert_eq!(tile.layers[0].features.len(), 1);
        assert_eq!(tile.layers[0].features[0].id, Some(1));
    }

    #[test]
    fn test_render_time_property() {
        let mut r = reading(0.0, 0.0, "10");
        r.time = Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
        let tile_id = TileId::new(0, 0, 0).unwrap();

        let (tile, _) =
            render_points(&[r], tile_id, &AqiConverter::pm10(), &RenderOptions::default()).unwrap();

        let layer = &tile.layers[0];
        let time = feature_property(&layer.features[0], &layer.keys, &layer.values, "time").unwrap();
        assert_eq!(time.string_value.as_deref(), Some("2025-03-01T12:00:00+00:00"));
    }

    #[test]
    fn test_render_skips_invalid_values_unless_strict() {
        let readings = vec![reading(0.0, 0.0, "abc"), reading(1.0, 1.0, "12")];
        let tile_id = TileId::new(0, 0, 0).unwrap();
        let converter = AqiConverter::pm10();

        let (tile, report) =
            render_points(&readings, tile_id, &converter, &RenderOptions::default()).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(tile.layers[0].features.len(), 1);

        let strict = RenderOptions {
            strict: true,
            ..Default::default()
        };
        assert!(matches!(
            render_points(&readings, tile_id, &converter, &strict),
            Err(TileError::Feature { feature: 0, .. })
        ));
    }
}

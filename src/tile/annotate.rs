//! Attaches AQI properties to the features of an existing tile.

use serde::Serialize;
use tracing::{debug, info};

use super::value::{TagTable, concentration_from_value, feature_property, string_value, uint_value};
use super::{AQI_KEY, CATEGORY_KEY, COLOR_KEY, TileError};
use crate::aqi::{AqiConverter, AqiError, AqiResult};
use crate::vector_tile::Tile;
use crate::vector_tile::tile::{Feature, Value};

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// Feature property holding the raw concentration.
    pub source_property: String,
    /// Only annotate the layer with this name.
    pub layer: Option<String>,
    /// Fail on the first feature that cannot be converted instead of
    /// skipping it.
    pub strict: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            source_property: "pm10".to_string(),
            layer: None,
            strict: false,
        }
    }
}

/// What happened during annotation.
#[derive(Debug, Default, Serialize)]
pub struct AnnotationReport {
    pub layers: usize,
    pub features: usize,
    pub annotated: usize,
    pub skipped: usize,
    #[serde(skip)]
    pub results: Vec<AqiResult>,
}

impl AnnotationReport {
    pub(crate) fn record(&mut self, result: AqiResult) {
        self.annotated += 1;
        self.results.push(result);
    }
}

/// Key indices of the three AQI properties in one layer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputKeys {
    aqi: u32,
    category: u32,
    color: u32,
}

impl OutputKeys {
    pub(crate) fn intern(table: &mut TagTable, keys: &mut Vec<String>) -> Self {
        Self {
            aqi: table.key(keys, AQI_KEY),
            category: table.key(keys, CATEGORY_KEY),
            color: table.key(keys, COLOR_KEY),
        }
    }

    fn contains(&self, key: u32) -> bool {
        key == self.aqi || key == self.category || key == self.color
    }

    /// Replaces any AQI tags of `feature` with `result`.
    pub(crate) fn apply(
        &self,
        feature: &mut Feature,
        table: &mut TagTable,
        values: &mut Vec<Value>,
        result: AqiResult,
    ) {
        let kept: Vec<u32> = feature
            .tags
            .chunks_exact(2)
            .filter(|pair| !self.contains(pair[0]))
            .flatten()
            .copied()
            .collect();
        feature.tags = kept;

        let aqi = table.value(values, uint_value(u64::from(result.aqi)));
        let category = table.value(values, string_value(result.category.label()));
        let color = table.value(values, string_value(result.color()));
        feature
            .tags
            .extend([self.aqi, aqi, self.category, category, self.color, color]);
    }
}

/// Converts the source property of every feature and attaches `aqi`,
/// `aqi_category` and `aqi_color`.
///
/// Features without a usable value are left untouched and counted as
/// skipped, unless `options.strict` is set.
///
/// # Errors
///
/// In strict mode, [`TileError::Feature`] for the first feature whose value
/// is missing or invalid.
pub fn annotate_tile(
    tile: &mut Tile,
    converter: &AqiConverter,
    options: &AnnotateOptions,
) -> Result<AnnotationReport, TileError> {
    let mut report = AnnotationReport::default();

    for layer in tile
        .layers
        .iter_mut()
        .filter(|l| options.layer.as_deref().is_none_or(|name| name == l.name))
    {
        report.layers += 1;
        let mut table = TagTable::from_layer(&layer.keys, &layer.values);
        let mut output_keys: Option<OutputKeys> = None;

        for (index, feature) in layer.features.iter_mut().enumerate() {
            report.features += 1;

            let converted = match feature_property(
                feature,
                &layer.keys,
                &layer.values,
                &options.source_property,
            ) {
                Some(value) => concentration_from_value(value)
                    .and_then(|c| converter.convert_concentration(c)),
                None => Err(AqiError::invalid(format!(
                    "property '{}' is missing",
                    options.source_property
                ))),
            };

            match converted {
                Ok(result) => {
                    let keys = *output_keys
                        .get_or_insert_with(|| OutputKeys::intern(&mut table, &mut layer.keys));
                    keys.apply(feature, &mut table, &mut layer.values, result);
                    report.record(result);
                }
                Err(source) if options.strict => {
                    return Err(TileError::Feature {
                        layer: layer.name.clone(),
                        feature: index,
                        source,
                    });
                }
                Err(e) => {
                    debug!(layer = %layer.name, feature = index, error = %e, "Feature skipped");
                    report.skipped += 1;
                }
            }
        }
    }

    info!(
        layers = report.layers,
        features = report.features,
        annotated = report.annotated,
        skipped = report.skipped,
        "Tile annotated"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::{AqiCategory, UpperBoundPolicy};
    use crate::tile::value::double_value;
    use crate::vector_tile::tile::Layer;

    fn layer_with(name: &str, readings: &[Value]) -> Layer {
        let mut layer = Layer {
            name: name.to_string(),
            keys: vec!["pm10".to_string()],
            ..Default::default()
        };
        for (i, value) in readings.iter().enumerate() {
            layer.values.push(value.clone());
            layer.features.push(Feature {
                id: Some(i as u64 + 1),
                tags: vec![0, i as u32],
                ..Default::default()
            });
        }
        layer
    }

    fn property<'a>(layer: &'a Layer, feature: usize, name: &str) -> Option<&'a Value> {
        feature_property(&layer.features[feature], &layer.keys, &layer.values, name)
    }

    #[test]
    fn test_annotates_every_feature() {
        let mut tile = Tile {
            layers: vec![layer_with(
                "sensors",
                &[double_value(0.0), double_value(100.0), string_value("500")],
            )],
        };

        let report =
            annotate_tile(&mut tile, &AqiConverter::pm10(), &AnnotateOptions::default()).unwrap();

        assert_eq!(report.layers, 1);
        assert_eq!(report.features, 3);
        assert_eq!(report.annotated, 3);
        assert_eq!(report.skipped, 0);

        let layer = &tile.layers[0];
        assert_eq!(property(layer, 0, AQI_KEY).unwrap().uint_value, Some(0));
        assert_eq!(property(layer, 1, AQI_KEY).unwrap().uint_value, Some(73));
        assert_eq!(
            property(layer, 1, CATEGORY_KEY).unwrap().string_value.as_deref(),
            Some("Moderate")
        );
        assert_eq!(property(layer, 2, AQI_KEY).unwrap().uint_value, Some(384));
        assert_eq!(
            property(layer, 2, COLOR_KEY).unwrap().string_value.as_deref(),
            Some(AqiCategory::Hazardous.color())
        );
        // Source property survives.
        assert!(property(layer, 1, "pm10").is_some());
    }

    #[test]
    fn test_skips_invalid_and_missing_values() {
        let mut layer = layer_with("sensors", &[double_value(-3.0), string_value("n/a")]);
        layer.features.push(Feature::default());
        let mut tile = Tile {
            layers: vec![layer],
        };

        let report =
            annotate_tile(&mut tile, &AqiConverter::pm10(), &AnnotateOptions::default()).unwrap();

        assert_eq!(report.features, 3);
        assert_eq!(report.annotated, 0);
        assert_eq!(report.skipped, 3);
        // Nothing to attach, so no AQI keys are added.
        assert_eq!(tile.layers[0].keys, vec!["pm10".to_string()]);
    }

    #[test]
    fn test_strict_mode_fails_on_first_invalid_feature() {
        let mut tile = Tile {
            layers: vec![layer_with("sensors", &[double_value(10.0), double_value(f64::NAN)])],
        };
        let options = AnnotateOptions {
            strict: true,
            ..Default::default()
        };

        let err = annotate_tile(&mut tile, &AqiConverter::pm10(), &options).unwrap_err();
        match err {
            TileError::Feature {
                layer,
                feature,
                source,
            } => {
                assert_eq!(layer, "sensors");
                assert_eq!(feature, 1);
                assert!(matches!(source, AqiError::InvalidInput { .. }));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_strict_reject_policy_surfaces_out_of_range() {
        let mut tile = Tile {
            layers: vec![layer_with("sensors", &[double_value(900.0)])],
        };
        let converter = AqiConverter::pm10().with_policy(UpperBoundPolicy::Reject);
        let options = AnnotateOptions {
            strict: true,
            ..Default::default()
        };

        let err = annotate_tile(&mut tile, &converter, &options).unwrap_err();
        assert!(matches!(
            err,
            TileError::Feature {
                source: AqiError::OutOfRange { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_layer_filter() {
        let mut tile = Tile {
            layers: vec![
                layer_with("sensors", &[double_value(10.0)]),
                layer_with("roads", &[double_value(10.0)]),
            ],
        };
        let options = AnnotateOptions {
            layer: Some("sensors".to_string()),
            ..Default::default()
        };

        let report = annotate_tile(&mut tile, &AqiConverter::pm10(), &options).unwrap();

        assert_eq!(report.layers, 1);
        assert!(property(&tile.layers[0], 0, AQI_KEY).is_some());
        assert!(property(&tile.layers[1], 0, AQI_KEY).is_none());
    }

    #[test]
    fn test_reannotation_replaces_previous_tags() {
        let mut tile = Tile {
            layers: vec![layer_with("sensors", &[double_value(100.0)])],
        };
        let converter = AqiConverter::pm10();
        let options = AnnotateOptions::default();

        annotate_tile(&mut tile, &converter, &options).unwrap();
        annotate_tile(&mut tile, &converter, &options).unwrap();

        let layer = &tile.layers[0];
        // pm10 plus three AQI pairs.
        assert_eq!(layer.features[0].tags.len(), 8);
        assert_eq!(layer.keys.len(), 4);
        assert_eq!(property(layer, 0, AQI_KEY).unwrap().uint_value, Some(73));
    }

    #[test]
    fn test_custom_source_property() {
        let mut layer = layer_with("sensors", &[double_value(60.0)]);
        layer.keys[0] = "pm10_ugm3".to_string();
        let mut tile = Tile {
            layers: vec![layer],
        };
        let options = AnnotateOptions {
            source_property: "pm10_ugm3".to_string(),
            ..Default::default()
        };

        let report = annotate_tile(&mut tile, &AqiConverter::pm10(), &options).unwrap();
        assert_eq!(report.annotated, 1);
        assert_eq!(report.results[0].category, AqiCategory::Moderate);
    }
}

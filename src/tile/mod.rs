//! Mapbox Vector Tile glue: decoding, AQI annotation and point rendering.
//!
//! The wire types come from `proto/vector_tile.proto` through prost; see
//! [`crate::vector_tile`].

pub mod annotate;
pub mod codec;
pub mod points;
pub mod value;

pub use annotate::{AnnotateOptions, AnnotationReport, annotate_tile};
pub use codec::{decode_tile, encode_tile, is_gzip};
pub use points::{RenderOptions, render_points};

pub use crate::vector_tile::Tile;

use crate::aqi::AqiError;

/// Property key holding the integer AQI.
pub const AQI_KEY: &str = "aqi";
/// Property key holding the category label.
pub const CATEGORY_KEY: &str = "aqi_category";
/// Property key holding the `#RRGGBB` category color.
pub const COLOR_KEY: &str = "aqi_color";

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("failed to decode vector tile: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("failed to (de)compress tile: {0}")]
    Io(#[from] std::io::Error),

    #[error("feature {feature} of layer '{layer}': {source}")]
    Feature {
        layer: String,
        feature: usize,
        #[source]
        source: AqiError,
    },
}

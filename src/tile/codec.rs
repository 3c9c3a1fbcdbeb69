//! Protobuf encoding of vector tiles, with optional gzip.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use prost::Message;
use std::io::{Read, Write};

use super::TileError;
use crate::vector_tile::Tile;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Tile servers commonly hand out gzip-compressed tiles.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decodes a tile, transparently gunzipping it first if needed.
///
/// # Errors
///
/// Returns an error if decompression fails or the bytes are not a valid
/// protobuf `Tile`.
pub fn decode_tile(bytes: &[u8]) -> Result<Tile, TileError> {
    if is_gzip(bytes) {
        let mut raw = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut raw)?;
        return Ok(Tile::decode(raw.as_slice())?);
    }
    Ok(Tile::decode(bytes)?)
}

pub fn encode_tile(tile: &Tile, gzip: bool) -> Result<Vec<u8>, TileError> {
    let raw = tile.encode_to_vec();
    if !gzip {
        return Ok(raw);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_tile::tile::Layer;

    fn sample_tile() -> Tile {
        Tile {
            layers: vec![Layer {
                name: "sensors".to_string(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_decode_empty_bytes_returns_empty_tile() {
        let tile = decode_tile(&[]).unwrap();
        assert!(tile.layers.is_empty());
    }

    #[test]
    fn test_decode_invalid_bytes() {
        assert!(decode_tile(&[0xFF, 0xFE, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_gzip_output_is_detected_and_decoded() {
        let bytes = encode_tile(&sample_tile(), true).unwrap();
        assert!(is_gzip(&bytes));

        let tile = decode_tile(&bytes).unwrap();
        assert_eq!(tile.layers[0].name, "sensors");
        assert_eq!(tile.layers[0].version, 1);
    }

    #[test]
    fn test_plain_output_is_not_gzip() {
        let bytes = encode_tile(&sample_tile(), false).unwrap();
        assert!(!is_gzip(&bytes));
        assert_eq!(decode_tile(&bytes).unwrap(), sample_tile());
    }
}

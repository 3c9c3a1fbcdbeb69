//! Coordinate helpers and Web Mercator tile addressing.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Deepest zoom level accepted by [`TileId`].
pub const MAX_ZOOM: u8 = 24;

/// Wraps a longitude into `[-180, 180)`.
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

pub fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

/// Address of one tile in the XYZ scheme (origin top left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, String> {
        if z > MAX_ZOOM {
            return Err(format!("zoom {z} exceeds {MAX_ZOOM}"));
        }
        let n = 1u64 << z;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(format!("tile {x}/{y} is outside zoom {z} (max {})", n - 1));
        }
        Ok(Self { z, x, y })
    }

    /// Number of tiles along one axis at this zoom.
    pub fn dimension(&self) -> f64 {
        f64::from(1u32 << self.z)
    }

    /// Projects a WGS84 coordinate into this tile's local space.
    ///
    /// The result is in `[0, extent)` for points inside the tile and may be
    /// negative or larger than `extent` for points outside it.
    pub fn project(&self, lon: f64, lat: f64, extent: u32) -> (i64, i64) {
        let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        let n = self.dimension();

        let world_x = (lon + 180.0) / 360.0 * n;
        let lat_rad = lat.to_radians();
        let world_y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

        let extent = f64::from(extent);
        let local_x = ((world_x - f64::from(self.x)) * extent).floor() as i64;
        let local_y = ((world_y - f64::from(self.y)) * extent).floor() as i64;
        (local_x, local_y)
    }
}

impl FromStr for TileId {
    type Err = String;

    /// Parses `z/x/y`, optionally followed by a file extension
    /// (`3/4/2.pbf`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();
        let [z, x, y] = parts.as_slice() else {
            return Err(format!("expected z/x/y, got '{s}'"));
        };
        let y = y.split_once('.').map_or(*y, |(stem, _)| stem);

        let z = z.parse().map_err(|_| format!("invalid zoom '{z}'"))?;
        let x = x.parse().map_err(|_| format!("invalid column '{x}'"))?;
        let y = y.parse().map_err(|_| format!("invalid row '{y}'"))?;
        TileId::new(z, x, y)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

pub mod aqi;
pub mod config;
pub mod fetch;
pub mod geo;
pub mod output;
pub mod reading;
pub mod stats;
pub mod tile;

pub mod vector_tile {
    include!(concat!(env!("OUT_DIR"), "/vector_tile.rs"));
}

//! Environment-driven settings.
//!
//! Values come from the process environment, usually populated from a `.env`
//! file by `dotenvy` at startup:
//!
//! ```text
//! LOG_FILE_PATH=logs/aqi_tiles.log
//! AQI_UPPER_BOUND=clamp            # or reject
//! AQI_SOURCE_PROPERTY=pm10
//! TILE_ACCESS_TOKEN=pk.xxxx
//! TILE_ACCESS_TOKEN_PARAM=access_token
//! ```

use anyhow::{Context, Result};

use crate::aqi::UpperBoundPolicy;

pub const DEFAULT_LOG_FILE_PATH: &str = "logs/aqi_tiles.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_file_path: String,
    pub upper_bound: UpperBoundPolicy,
    pub source_property: String,
    pub access_token: Option<String>,
    pub access_token_param: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_file_path: DEFAULT_LOG_FILE_PATH.to_string(),
            upper_bound: UpperBoundPolicy::Clamp,
            source_property: "pm10".to_string(),
            access_token: None,
            access_token_param: "access_token".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let upper_bound = match get("AQI_UPPER_BOUND") {
            Some(raw) => raw
                .parse::<UpperBoundPolicy>()
                .map_err(anyhow::Error::msg)
                .context("AQI_UPPER_BOUND")?,
            None => defaults.upper_bound,
        };

        Ok(Self {
            log_file_path: get("LOG_FILE_PATH").unwrap_or(defaults.log_file_path),
            upper_bound,
            source_property: get("AQI_SOURCE_PROPERTY").unwrap_or(defaults.source_property),
            access_token: get("TILE_ACCESS_TOKEN"),
            access_token_param: get("TILE_ACCESS_TOKEN_PARAM")
                .unwrap_or(defaults.access_token_param),
        })
    }
}

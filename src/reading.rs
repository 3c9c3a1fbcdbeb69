//! Pollutant readings and their validation.
//!
//! Raw values arrive loosely typed (CSV text, JSON, tile properties) and are
//! validated into a [`Concentration`] before any conversion happens.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::aqi::{AqiCategory, AqiConverter, AqiError, AqiResult};
use crate::geo::{is_valid_latitude, normalize_longitude};

/// Why a site reading could not be turned into point data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadingError {
    #[error("invalid location (latitude {latitude}, longitude {longitude})")]
    InvalidLocation { latitude: f64, longitude: f64 },

    #[error(transparent)]
    Value(#[from] AqiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm10,
    Pm25,
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pollutant::Pm10 => write!(f, "pm10"),
            Pollutant::Pm25 => write!(f, "pm25"),
        }
    }
}

impl FromStr for Pollutant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['.', '_'], "").as_str() {
            "pm10" => Ok(Pollutant::Pm10),
            "pm25" | "pm2p5" => Ok(Pollutant::Pm25),
            other => Err(format!("unknown pollutant '{other}'")),
        }
    }
}

/// A finite, non-negative concentration in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Concentration(f64);

impl Concentration {
    pub fn new(value: f64) -> Result<Self, AqiError> {
        if value.is_nan() {
            return Err(AqiError::invalid("value is NaN"));
        }
        if value.is_infinite() {
            return Err(AqiError::invalid("value is not finite"));
        }
        if value < 0.0 {
            return Err(AqiError::invalid(format!("{value} is negative")));
        }
        // Normalizes -0.0.
        Ok(Self(value.abs()))
    }

    /// Parses a textual reading such as `" 42.5 "`.
    pub fn parse(raw: &str) -> Result<Self, AqiError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AqiError::invalid("value is missing"));
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| AqiError::invalid(format!("'{trimmed}' is not a number")))?;
        Self::new(value)
    }

    /// Validates an optional value, treating `None` as a missing reading.
    pub fn from_option(value: Option<f64>) -> Result<Self, AqiError> {
        value
            .ok_or_else(|| AqiError::invalid("value is missing"))
            .and_then(Self::new)
    }

    /// Accepts JSON numbers and numeric strings.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, AqiError> {
        match value {
            serde_json::Value::Null => Err(AqiError::invalid("value is null")),
            serde_json::Value::Number(n) => Self::from_option(n.as_f64()),
            serde_json::Value::String(s) => Self::parse(s),
            other => Err(AqiError::invalid(format!("unsupported JSON value {other}"))),
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Concentration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} µg/m³", self.0)
    }
}

/// A validated pollutant measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PollutantReading {
    pub pollutant: Pollutant,
    pub concentration: Concentration,
}

impl PollutantReading {
    pub fn new(pollutant: Pollutant, value: f64) -> Result<Self, AqiError> {
        Ok(Self {
            pollutant,
            concentration: Concentration::new(value)?,
        })
    }

    pub fn pm10(concentration: Concentration) -> Self {
        Self {
            pollutant: Pollutant::Pm10,
            concentration,
        }
    }
}

/// A single row of a readings CSV: `latitude,longitude,pm10[,time]`.
///
/// `pm10` is kept as text so that validation happens in one place.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteReading {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub pm10: Option<String>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl SiteReading {
    /// `(latitude, longitude)` with the longitude wrapped into `[-180, 180)`,
    /// or `None` when the row cannot be placed on the map.
    pub fn position(&self) -> Option<(f64, f64)> {
        (is_valid_latitude(self.latitude) && self.longitude.is_finite())
            .then(|| (self.latitude, normalize_longitude(self.longitude)))
    }

    pub fn concentration(&self) -> Result<Concentration, AqiError> {
        match self.pm10.as_deref() {
            Some(raw) => Concentration::parse(raw),
            None => Err(AqiError::invalid("value is missing")),
        }
    }

    pub fn reading(&self) -> Result<PollutantReading, AqiError> {
        self.concentration().map(PollutantReading::pm10)
    }

    /// Validates the location and converts this row's pm10 value.
    pub fn annotate(&self, converter: &AqiConverter) -> Result<AnnotatedReading, ReadingError> {
        let (latitude, longitude) = self.position().ok_or(ReadingError::InvalidLocation {
            latitude: self.latitude,
            longitude: self.longitude,
        })?;
        let concentration = self.concentration()?;
        let result = converter.convert_concentration(concentration)?;
        Ok(AnnotatedReading {
            latitude,
            longitude,
            pm10: concentration.value(),
            aqi: result.aqi,
            category: result.category,
            color: result.color().to_string(),
            time: self.time,
        })
    }
}

/// A site reading together with its AQI, the shape served as point data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedReading {
    pub latitude: f64,
    pub longitude: f64,
    pub pm10: f64,
    pub aqi: u16,
    pub category: AqiCategory,
    pub color: String,
    pub time: Option<DateTime<Utc>>,
}

impl AnnotatedReading {
    pub fn result(&self) -> AqiResult {
        AqiResult {
            aqi: self.aqi,
            category: self.category,
        }
    }
}

/// Converts every row, logging and dropping the ones that fail.
pub fn annotate_readings(rows: &[SiteReading], converter: &AqiConverter) -> Vec<AnnotatedReading> {
    let mut annotated = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for (index, row) in rows.iter().enumerate() {
        match row.annotate(converter) {
            Ok(reading) => annotated.push(reading),
            Err(e) => {
                warn!(row = index, error = %e, "Reading skipped");
                skipped += 1;
            }
        }
    }

    info!(annotated = annotated.len(), skipped, "Readings converted");
    annotated
}

/// Loads all rows of a readings CSV.
///
/// Rows with an empty `pm10` column are dropped, matching an upstream
/// `WHERE pm10 IS NOT NULL`.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_readings(path: &Path) -> Result<Vec<SiteReading>> {
    let file = File::open(path)?;
    read_readings(file)
}

/// Reads readings CSV rows from any reader.
pub fn read_readings<R: std::io::Read>(reader: R) -> Result<Vec<SiteReading>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    let mut without_value = 0usize;

    for result in rdr.deserialize() {
        let record: SiteReading = result?;
        if record.pm10.as_deref().is_none_or(|v| v.trim().is_empty()) {
            without_value += 1;
            continue;
        }
        rows.push(record);
    }

    if without_value > 0 {
        warn!(without_value, "Dropped rows without a pm10 value");
    }
    debug!(rows = rows.len(), "Readings loaded");

    Ok(rows)
}

use serde::Serialize;
use std::str::FromStr;

use crate::aqi::breakpoint::{BreakpointTable, PM10, PM25};
use crate::aqi::category::AqiCategory;
use crate::aqi::error::AqiError;
use crate::reading::{Concentration, Pollutant, PollutantReading};

/// Upper bound of the AQI scale.
pub const AQI_MAX: u16 = 500;

/// What to do with concentrations above the table's last breakpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpperBoundPolicy {
    /// Report `500` / Hazardous.
    #[default]
    Clamp,
    /// Fail with [`AqiError::OutOfRange`].
    Reject,
}

impl FromStr for UpperBoundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(UpperBoundPolicy::Clamp),
            "reject" => Ok(UpperBoundPolicy::Reject),
            other => Err(format!("unknown upper bound policy '{other}', expected clamp or reject")),
        }
    }
}

/// Result of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AqiResult {
    pub aqi: u16,
    pub category: AqiCategory,
}

impl AqiResult {
    pub fn color(&self) -> &'static str {
        self.category.color()
    }
}

/// Stateless converter over one breakpoint table.
#[derive(Debug, Clone, Copy)]
pub struct AqiConverter {
    table: &'static BreakpointTable,
    policy: UpperBoundPolicy,
}

impl AqiConverter {
    pub fn new(table: &'static BreakpointTable) -> Self {
        Self {
            table,
            policy: UpperBoundPolicy::default(),
        }
    }

    pub fn pm10() -> Self {
        Self::new(&PM10)
    }

    pub fn pm25() -> Self {
        Self::new(&PM25)
    }

    pub fn for_pollutant(pollutant: Pollutant) -> Self {
        match pollutant {
            Pollutant::Pm10 => Self::pm10(),
            Pollutant::Pm25 => Self::pm25(),
        }
    }

    pub fn with_policy(mut self, policy: UpperBoundPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn pollutant(&self) -> Pollutant {
        self.table.pollutant
    }

    pub fn policy(&self) -> UpperBoundPolicy {
        self.policy
    }

    /// Converts a raw concentration in µg/m³.
    ///
    /// # Errors
    ///
    /// [`AqiError::InvalidInput`] for negative or non-finite values, and
    /// [`AqiError::OutOfRange`] above the last breakpoint when the policy is
    /// [`UpperBoundPolicy::Reject`].
    pub fn convert(&self, concentration: f64) -> Result<AqiResult, AqiError> {
        let concentration = Concentration::new(concentration)?;
        self.convert_concentration(concentration)
    }

    pub fn convert_concentration(&self, concentration: Concentration) -> Result<AqiResult, AqiError> {
        let truncated = self.table.truncate(concentration.value());

        let Some(index) = self.table.find(truncated) else {
            return match self.policy {
                UpperBoundPolicy::Clamp => Ok(AqiResult {
                    aqi: AQI_MAX,
                    category: AqiCategory::Hazardous,
                }),
                UpperBoundPolicy::Reject => Err(AqiError::OutOfRange {
                    concentration: concentration.value(),
                    max: self.table.max_concentration(),
                }),
            };
        };

        let segment = &self.table.segments[index];
        // f64::round is half away from zero.
        let aqi = segment.interpolate(truncated).round();
        let aqi = aqi.clamp(f64::from(segment.aqi_low), f64::from(segment.aqi_high)) as u16;

        Ok(AqiResult {
            aqi,
            category: segment.category,
        })
    }

    /// Converts a reading, picking the table of its pollutant.
    ///
    /// The upper bound policy of `self` is kept.
    pub fn convert_reading(&self, reading: &PollutantReading) -> Result<AqiResult, AqiError> {
        Self::for_pollutant(reading.pollutant)
            .with_policy(self.policy)
            .convert_concentration(reading.concentration)
    }
}

/// Converts a PM10 concentration (µg/m³) with the default clamp policy.
///
/// Uses the US EPA 24-hour PM10 table (2024 revision): values are truncated
/// to whole µg/m³, `0..=54` is Good (so `50.0` gives 46) and Moderate starts
/// at 55. Anything above 604 is reported as 500 / Hazardous.
pub fn convert(pm10_concentration: f64) -> Result<AqiResult, AqiError> {
    AqiConverter::pm10().convert(pm10_concentration)
}

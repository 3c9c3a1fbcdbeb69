use crate::aqi::category::AqiCategory;
use crate::reading::Pollutant;

/// One segment of the piecewise-linear concentration to AQI mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub concentration_low: f64,
    pub concentration_high: f64,
    pub aqi_low: u16,
    pub aqi_high: u16,
    pub category: AqiCategory,
}

impl Breakpoint {
    const fn new(
        concentration_low: f64,
        concentration_high: f64,
        aqi_low: u16,
        aqi_high: u16,
        category: AqiCategory,
    ) -> Self {
        Self {
            concentration_low,
            concentration_high,
            aqi_low,
            aqi_high,
            category,
        }
    }

    pub fn contains(&self, concentration: f64) -> bool {
        self.concentration_low <= concentration && concentration <= self.concentration_high
    }

    /// Linear interpolation inside this segment, before rounding.
    pub fn interpolate(&self, concentration: f64) -> f64 {
        let aqi_span = f64::from(self.aqi_high - self.aqi_low);
        let concentration_span = self.concentration_high - self.concentration_low;
        aqi_span / concentration_span * (concentration - self.concentration_low)
            + f64::from(self.aqi_low)
    }
}

/// Ordered breakpoint segments for one pollutant.
///
/// Concentrations are truncated to `decimals` places before lookup, which is
/// the EPA reporting convention and what makes the published segments
/// contiguous (PM10 `54` and `55` are neighbours, nothing falls in between).
#[derive(Debug)]
pub struct BreakpointTable {
    pub pollutant: Pollutant,
    pub decimals: u32,
    pub segments: &'static [Breakpoint],
}

impl BreakpointTable {
    /// Truncates a concentration to the table's reporting precision.
    pub fn truncate(&self, concentration: f64) -> f64 {
        let factor = 10f64.powi(self.decimals as i32);
        let scaled = concentration * factor;
        // Snap only representation error (9.1 * 10 is 90.99999999999999), so
        // genuine fractions just below a step still truncate down.
        let nearest = scaled.round();
        let tolerance = 4.0 * f64::EPSILON * scaled.abs().max(1.0);
        let whole = if (scaled - nearest).abs() <= tolerance {
            nearest
        } else {
            scaled.floor()
        };
        whole / factor
    }

    /// Index of the segment holding an already truncated concentration, or
    /// `None` above the last segment.
    ///
    /// Shared boundaries resolve to the lower segment.
    pub fn find(&self, truncated: f64) -> Option<usize> {
        self.segments
            .iter()
            .position(|bp| truncated <= bp.concentration_high)
    }

    /// Highest concentration covered by the table.
    pub fn max_concentration(&self) -> f64 {
        self.segments
            .last()
            .map(|bp| bp.concentration_high)
            .unwrap_or(0.0)
    }
}

/// US EPA 24-hour PM10 breakpoints (µg/m³), 2024 revision.
pub static PM10: BreakpointTable = BreakpointTable {
    pollutant: Pollutant::Pm10,
    decimals: 0,
    segments: &[
        Breakpoint::new(0.0, 54.0, 0, 50, AqiCategory::Good),
        Breakpoint::new(55.0, 154.0, 51, 100, AqiCategory::Moderate),
        Breakpoint::new(155.0, 254.0, 101, 150, AqiCategory::UnhealthyForSensitiveGroups),
        Breakpoint::new(255.0, 354.0, 151, 200, AqiCategory::Unhealthy),
        Breakpoint::new(355.0, 424.0, 201, 300, AqiCategory::VeryUnhealthy),
        Breakpoint::new(425.0, 604.0, 301, 500, AqiCategory::Hazardous),
    ],
};

/// US EPA 24-hour PM2.5 breakpoints (µg/m³), 2024 revision.
pub static PM25: BreakpointTable = BreakpointTable {
    pollutant: Pollutant::Pm25,
    decimals: 1,
    segments: &[
        Breakpoint::new(0.0, 9.0, 0, 50, AqiCategory::Good),
        Breakpoint::new(9.1, 35.4, 51, 100, AqiCategory::Moderate),
        Breakpoint::new(35.5, 55.4, 101, 150, AqiCategory::UnhealthyForSensitiveGroups),
        Breakpoint::new(55.5, 125.4, 151, 200, AqiCategory::Unhealthy),
        Breakpoint::new(125.5, 225.4, 201, 300, AqiCategory::VeryUnhealthy),
        Breakpoint::new(225.5, 325.4, 301, 500, AqiCategory::Hazardous),
    ],
};

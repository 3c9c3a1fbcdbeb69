//! PM10/PM2.5 concentration to Air Quality Index conversion.
//!
//! The conversion is the piecewise-linear EPA formula over a static
//! breakpoint table. See [`converter::convert`] for the PM10 entry point.

pub mod breakpoint;
pub mod category;
pub mod converter;
pub mod error;

pub use breakpoint::{Breakpoint, BreakpointTable, PM10, PM25};
pub use category::AqiCategory;
pub use converter::{AqiConverter, AqiResult, UpperBoundPolicy, convert};
pub use error::AqiError;

/// Validation failures of the AQI conversion.
///
/// Both variants are deterministic: retrying with the same input yields the
/// same error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AqiError {
    #[error("invalid concentration: {reason}")]
    InvalidInput { reason: String },

    #[error("concentration {concentration} exceeds the highest breakpoint ({max})")]
    OutOfRange { concentration: f64, max: f64 },
}

impl AqiError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        AqiError::InvalidInput {
            reason: reason.into(),
        }
    }
}

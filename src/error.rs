//! Error types for simulation setup.
//!
//! Only configuration problems are errors. Physical faults during a step
//! (non-finite values, clamped limits, over-extended lines) are reported as
//! [`WarningEvent`](crate::sim::WarningEvent)s and never abort a flight.

use thiserror::Error;

/// Errors that prevent a simulation from being constructed or reset.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A quantity that must be strictly positive and finite is not.
    #[error("invalid {name}: {value} (must be positive and finite)")]
    NonPositive {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A fraction outside its allowed range.
    #[error("invalid {name}: {value} (must be in [{min}, {max}])")]
    OutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// A fraction that must lie strictly between its bounds.
    #[error("invalid {name}: {value} (must be in ({min}, {max}))")]
    OutsideOpenRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Exclusive lower bound.
        min: f64,
        /// Exclusive upper bound.
        max: f64,
    },

    /// Invalid configuration that does not fit a numeric range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Kite geometry cannot be used for aerodynamics.
    #[error("invalid kite geometry: {reason}")]
    InvalidGeometry {
        /// Description of what is wrong.
        reason: String,
    },

    /// The requested launch pose cannot be reached with the configured lines.
    #[error("altitude {altitude} m unreachable with {line_length} m lines")]
    Unreachable {
        /// Requested altitude.
        altitude: f64,
        /// Configured line length.
        line_length: f64,
    },
}

impl SimError {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid geometry error.
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }
}

/// Result type for simulation setup.
pub type Result<T> = std::result::Result<T, SimError>;

/// Check that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::NonPositive { name, value })
    }
}

/// Check that `value` lies in `[min, max]`.
pub(crate) fn ensure_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(SimError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(ensure_positive("mass", 0.3).is_ok());
        assert!(ensure_positive("mass", 0.0).is_err());
        assert!(ensure_positive("mass", -1.0).is_err());
        assert!(ensure_positive("mass", f64::NAN).is_err());
    }

    #[test]
    fn range_is_inclusive() {
        assert!(ensure_range("turbulence", 1.0, 0.0, 1.0).is_ok());
        assert!(ensure_range("turbulence", 1.01, 0.0, 1.0).is_err());
    }

    #[test]
    fn open_range_message_excludes_bounds() {
        let err = SimError::OutsideOpenRange {
            name: "constraint_relaxation",
            value: 1.0,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid constraint_relaxation: 1 (must be in (0, 1))"
        );
    }

    #[test]
    fn error_messages_name_the_parameter() {
        let err = SimError::NonPositive { name: "mass", value: -2.0 };
        assert!(err.to_string().contains("mass"));
    }
}

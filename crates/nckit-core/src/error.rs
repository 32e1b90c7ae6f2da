//! Error handling for NCKit
//!
//! Structural errors only. These describe configuration or input records
//! that are malformed (inverted axis bounds, negative tool lengths,
//! non-finite coordinates) and are fatal to the call that received them.
//!
//! Envelope violations, singularity risk and similar findings are not
//! errors; they are returned as data by the engines.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised when pivot or tool geometry, or a coordinate handed to a
/// kinematic computation, is not physically meaningful.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A length that must be zero or positive was negative
    #[error("Non-physical {field}: {value} mm (must be >= 0)")]
    NegativeLength {
        /// Name of the offending geometry field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A value that must be finite was NaN or infinite
    #[error("Non-finite value for {field}")]
    NonFinite {
        /// Name of the offending field.
        field: String,
    },

    /// A tolerance or epsilon that must be positive was not
    #[error("Invalid tolerance for {field}: {value}")]
    InvalidTolerance {
        /// Name of the tolerance field.
        field: String,
        /// The rejected value.
        value: f64,
    },
}

/// Axis limit error type
///
/// Raised for travel-limit configuration that cannot describe a real
/// machine axis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LimitsError {
    /// Lower bound above upper bound
    #[error("Invalid axis limit for {axis}: min {min} > max {max}")]
    Inverted {
        /// The axis identifier.
        axis: String,
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },

    /// A bound was NaN or infinite
    #[error("Invalid axis limit for {axis}: bounds must be finite")]
    NonFinite {
        /// The axis identifier.
        axis: String,
    },

    /// A safety margin leaves no usable travel on an axis
    #[error("Safety margin {margin} mm leaves no travel on {axis}")]
    MarginTooLarge {
        /// The axis identifier.
        axis: String,
        /// The requested margin.
        margin: f64,
    },

    /// A margin or clearance input was negative or non-finite
    #[error("Invalid envelope parameter '{field}': {value}")]
    InvalidParameter {
        /// Name of the parameter.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A toolpath coordinate was NaN or infinite
    #[error("Point {point_index} has a non-finite {axis} coordinate")]
    NonFiniteCoordinate {
        /// Index of the point in the checked path.
        point_index: usize,
        /// The axis identifier.
        axis: String,
    },
}

/// Main error type for NCKit
///
/// A unified error type covering every structural failure of the core
/// data model.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Axis limit error
    #[error(transparent)]
    Limits(#[from] LimitsError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }

    /// Check if this is an axis limit error
    pub fn is_limits_error(&self) -> bool {
        matches!(self, Error::Limits(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Reject NaN and infinities with a named [`GeometryError::NonFinite`].
pub fn ensure_finite(field: &str, value: f64) -> std::result::Result<f64, GeometryError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GeometryError::NonFinite {
            field: field.to_string(),
        })
    }
}

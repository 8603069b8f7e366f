// Error taxonomy for the units layer
// Every failure here is a programming or configuration error: raised
// synchronously to the caller, never retried or recovered internally.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, UnitsError>;

#[derive(Debug, Error)]
pub enum UnitsError {
    /// Unit string not recognized by the registry
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// Operands or conversion target have incompatible dimensionality
    #[error("cannot {operation} '{left}' ({left_dim}) and '{right}' ({right_dim}): incompatible dimensions")]
    DimensionMismatch {
        operation: String,
        left: String,
        right: String,
        left_dim: String,
        right_dim: String,
    },

    /// `check_dimensions` found a signature other than the expected one
    #[error("dimension check failed: quantity has {actual}, expected {expected}")]
    DimensionCheck { actual: String, expected: String },

    /// Requested unit system name is not in the registered table
    #[error("unknown unit system '{name}' (known systems: {known})")]
    UnknownUnitSystem { name: String, known: String },

    /// Strict policy hit a non-conforming unit with auto-convert disabled
    #[error("unit policy violation for '{quantity_type}': expected '{expected}', got '{actual}'")]
    PolicyViolation {
        quantity_type: String,
        expected: String,
        actual: String,
    },

    /// Formatter asked for a format outside the supported set
    #[error("unsupported export format '{0}' (supported: json, text, csv)")]
    UnsupportedFormat(String),

    /// SVG rendering requested without the optional graph library compiled in
    #[error("{0} requires the optional '{1}' dependency (rebuild with the corresponding cargo feature)")]
    MissingDependency(String, String),

    /// Unit spec names a parameter the calculation signature does not have
    #[error("calculation '{calc}' has no parameter '{param}'")]
    UnknownParameter { calc: String, param: String },

    /// Call site left a parameter without an argument or default
    #[error("calculation '{calc}' is missing an argument for '{param}'")]
    MissingArgument { calc: String, param: String },

    /// Call site passed more arguments than the signature declares
    #[error("calculation '{calc}' takes {expected} argument(s), got {given}")]
    TooManyArguments {
        calc: String,
        expected: usize,
        given: usize,
    },

    /// Serialized quantity could not be decoded
    #[error("invalid serialized quantity: {0}")]
    InvalidSerialized(String),

    /// CSV writer failed (in practice only on a broken sink)
    #[error("csv export failed: {0}")]
    Csv(String),
}

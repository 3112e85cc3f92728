//! Error types for Stardust.

use thiserror::Error;

/// Top-level error type for Stardust operations.
#[derive(Debug, Error)]
pub enum StardustError {
    /// Emitter configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Emitter reconfiguration errors.
///
/// These never abort a running emitter: the offending change is dropped and
/// the previous shape is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field that changes slot capacity or block shape was edited while live
    #[error("cannot change `{field}` while the emitter is playing")]
    ShapeChangeWhileLive {
        /// Name of the rejected field
        field: &'static str,
    },

    /// New kinematic or curve terms were requested while live
    #[error("cannot add attributes ({attributes}) at run-time")]
    FeaturesWhileLive {
        /// Comma separated attribute names
        attributes: String,
    },

    /// `relative` is fixed at construction
    #[error("`relative` cannot be changed after the emitter is created")]
    RelativeChange,
}

/// Result type alias for Stardust operations.
pub type StardustResult<T> = Result<T, StardustError>;

//! Error types for the stat-card engine

use thiserror::Error;

/// Result type alias for card operations
pub type Result<T> = std::result::Result<T, CardError>;

/// Errors surfaced to callers of the layout, raster and export stages.
///
/// Layout degradations (one empty list, long titles, extreme magnitudes) are
/// handled by policy and never show up here.
#[derive(Error, Debug)]
pub enum CardError {
    /// Snapshot has nothing renderable and the configured policy rejects it
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Surface size violates the plan's contract
    #[error("invalid surface dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Surface could not be serialised to the output format
    #[error("encoding failed: {0}")]
    EncodingFailure(String),

    /// Export was cancelled before the asset was published
    #[error("export cancelled")]
    Cancelled,

    /// No usable font face
    #[error("font error: {0}")]
    Font(String),

    /// Layout configuration could not be read or parsed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Publishing the encoded asset failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CardError {
    pub(crate) fn dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        CardError::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }
}
